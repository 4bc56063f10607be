//! Role-based feature visibility and the per-role feature listing.
//!
//! Visibility governs interactivity, not existence: a feature hidden from a
//! role is still listed, just marked non-interactive.

use url::Url;

use crate::{
    manifest::{EventManifest, Feature},
    models::FeatureKind,
    resolver::SessionContext,
};

/// Kinds shown in the event's "more" menu.
pub const MENU_KINDS: [FeatureKind; 8] = [
    FeatureKind::Puzzle,
    FeatureKind::Ticket,
    FeatureKind::Telegram,
    FeatureKind::Venue,
    FeatureKind::Staffs,
    FeatureKind::Sponsors,
    FeatureKind::Partners,
    FeatureKind::WebView,
];

/// Whether `role` may interact with `feature`.
pub fn is_visible(feature: &Feature, role: &str) -> bool {
    if role.is_empty() {
        return true;
    }
    match &feature.visible_roles {
        Some(roles) if !roles.is_empty() => roles.contains(role),
        _ => true,
    }
}

/// One row of a feature listing.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEntry {
    /// The manifest feature this row presents.
    pub feature: Feature,
    /// Known kind, if recognised.
    pub kind: Option<FeatureKind>,
    /// Label in the requested language; empty when untranslated.
    pub label: String,
    /// Resolved URL, absent when the feature has none or it did not resolve.
    pub url: Option<Url>,
    /// Whether the current role may interact with the feature.
    pub interactive: bool,
}

impl FeatureEntry {
    /// Whether selecting this entry can lead anywhere.
    pub fn is_actionable(&self) -> bool {
        self.interactive && self.url.is_some()
    }
}

/// Features of an event resolved for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureListing {
    entries: Vec<FeatureEntry>,
}

impl FeatureListing {
    /// Resolve every feature of `manifest` for `ctx`, in manifest order.
    pub fn build(manifest: &EventManifest, ctx: &SessionContext, language: &str) -> Self {
        let entries = manifest
            .features
            .iter()
            .map(|feature| FeatureEntry {
                kind: feature.known_kind(),
                label: feature.display_text.get(language).to_string(),
                url: feature.resolve_url(ctx),
                interactive: is_visible(feature, &ctx.role),
                feature: feature.clone(),
            })
            .collect();
        Self { entries }
    }

    /// All entries, including unknown kinds.
    pub fn entries(&self) -> &[FeatureEntry] {
        &self.entries
    }

    /// Entries for the "more" menu: menu kinds only, unknown kinds dropped.
    pub fn menu_entries(&self) -> Vec<&FeatureEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.kind.is_some_and(|kind| MENU_KINDS.contains(&kind)))
            .collect()
    }

    /// First entry of `kind`.
    pub fn entry(&self, kind: FeatureKind) -> Option<&FeatureEntry> {
        self.entries.iter().find(|entry| entry.kind == Some(kind))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;
    use crate::manifest::tests::sample_document;
    use crate::models::LocalizedText;

    fn feature(roles: Option<&[&str]>) -> Feature {
        Feature {
            kind: "webview".to_string(),
            icon: None,
            display_text: LocalizedText::default(),
            url_template: None,
            visible_roles: roles.map(|roles| roles.iter().map(|r| r.to_string()).collect()),
        }
    }

    #[test]
    fn empty_role_sees_everything() {
        assert!(is_visible(&feature(None), ""));
        assert!(is_visible(&feature(Some(&["staff"][..])), ""));
        assert!(is_visible(&feature(Some(&[][..])), ""));
    }

    #[test]
    fn restricted_feature_matches_role() {
        let staff_only = feature(Some(&["staff"][..]));
        assert!(is_visible(&staff_only, "staff"));
        assert!(!is_visible(&staff_only, "attendee"));
    }

    #[test]
    fn unrestricted_feature_is_visible_to_any_role() {
        assert!(is_visible(&feature(None), "attendee"));
        let mut empty = feature(None);
        empty.visible_roles = Some(BTreeSet::new());
        assert!(is_visible(&empty, "attendee"));
    }

    #[test]
    fn listing_keeps_hidden_features_but_disables_them() -> anyhow::Result<()> {
        let manifest = EventManifest::parse(sample_document("e"))?;
        let listing = FeatureListing::build(
            &manifest,
            &SessionContext::new("abc123", "attendee"),
            "en",
        );
        assert_eq!(listing.len(), 4);

        let webview = listing.entry(FeatureKind::WebView).expect("webview");
        assert!(!webview.interactive);
        assert_eq!(
            webview.url.as_ref().map(Url::as_str),
            Some("https://x/abc123/attendee")
        );
        assert!(!webview.is_actionable());

        let ticket = listing.entry(FeatureKind::Ticket).expect("ticket");
        assert!(ticket.interactive);
        assert_eq!(ticket.label, "Ticket");
        Ok(())
    }

    #[test]
    fn bad_template_does_not_abort_listing() -> anyhow::Result<()> {
        let mut document = sample_document("e");
        document["features"] = json!([
            { "feature": "venue", "url": "{role}/not-absolute" },
            { "feature": "sponsors", "url": "https://example.com/sponsors" }
        ]);
        let manifest = EventManifest::parse(document)?;
        let listing = FeatureListing::build(&manifest, &SessionContext::default(), "zh");
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.entries()[0].url, None);
        assert!(listing.entries()[1].is_actionable());
        assert_eq!(listing.entries()[1].label, "");
        Ok(())
    }

    #[test]
    fn menu_drops_unknown_and_non_menu_kinds() -> anyhow::Result<()> {
        let manifest = EventManifest::parse(sample_document("e"))?;
        let listing = FeatureListing::build(&manifest, &SessionContext::default(), "en");
        let kinds: Vec<_> = listing
            .menu_entries()
            .into_iter()
            .filter_map(|entry| entry.kind)
            .collect();
        assert_eq!(kinds, [FeatureKind::WebView, FeatureKind::Ticket]);
        Ok(())
    }
}

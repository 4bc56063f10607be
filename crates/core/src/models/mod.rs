//! Shared domain models.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use url::Url;

/// Free-form mapping from language code to display string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Build from `(language, text)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(lang, text)| (lang.into(), text.into()))
                .collect(),
        )
    }

    /// Text for `language`, or an empty string when that language is absent.
    pub fn get(&self, language: &str) -> &str {
        self.0.get(language).map(String::as_str).unwrap_or("")
    }

    /// Whether any translation contains `needle` (already lowercased).
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.0
            .values()
            .any(|value| value.to_lowercase().contains(needle))
    }

    /// Whether no translations are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Feature identifiers the client knows how to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum FeatureKind {
    FastPass,
    Schedule,
    Announcement,
    Puzzle,
    Ticket,
    Telegram,
    Im,
    Venue,
    Sponsors,
    Partners,
    Staffs,
    WebView,
}

impl FeatureKind {
    /// Every known kind, in declaration order.
    pub const ALL: [FeatureKind; 12] = [
        FeatureKind::FastPass,
        FeatureKind::Schedule,
        FeatureKind::Announcement,
        FeatureKind::Puzzle,
        FeatureKind::Ticket,
        FeatureKind::Telegram,
        FeatureKind::Im,
        FeatureKind::Venue,
        FeatureKind::Sponsors,
        FeatureKind::Partners,
        FeatureKind::Staffs,
        FeatureKind::WebView,
    ];

    /// Identifier used in manifest documents.
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::FastPass => "fastpass",
            FeatureKind::Schedule => "schedule",
            FeatureKind::Announcement => "announcement",
            FeatureKind::Puzzle => "puzzle",
            FeatureKind::Ticket => "ticket",
            FeatureKind::Telegram => "telegram",
            FeatureKind::Im => "im",
            FeatureKind::Venue => "venue",
            FeatureKind::Sponsors => "sponsors",
            FeatureKind::Partners => "partners",
            FeatureKind::Staffs => "staffs",
            FeatureKind::WebView => "webview",
        }
    }

    /// Map a raw manifest identifier onto a known kind. Unknown identifiers
    /// yield `None` and are left for forward compatibility.
    pub fn from_raw(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short description of an event as returned by the event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Stable event identifier.
    pub event_id: String,
    /// Localized event name.
    pub display_name: LocalizedText,
    /// Event logo.
    pub logo_url: Url,
}

impl EventSummary {
    /// Returns a user-facing label, falling back to the event id.
    pub fn label(&self, language: &str) -> String {
        match self.display_name.get(language) {
            "" => self.event_id.clone(),
            name => name.to_string(),
        }
    }
}

/// Identity returned by credential redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Attendee or staff identifier.
    pub user_id: String,
    /// Role tag controlling feature interactivity.
    #[serde(default)]
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_language_is_empty() {
        let text = LocalizedText::from_pairs([("en", "Schedule"), ("zh", "議程")]);
        assert_eq!(text.get("en"), "Schedule");
        assert_eq!(text.get("zh"), "議程");
        assert_eq!(text.get("ja"), "");
    }

    #[test]
    fn known_kinds_round_trip_through_raw_identifier() {
        for kind in FeatureKind::ALL {
            assert_eq!(FeatureKind::from_raw(kind.as_str()), Some(kind));
        }
        assert_eq!(FeatureKind::from_raw("hologram"), None);
        assert_eq!(FeatureKind::from_raw("WebView"), None);
    }

    #[test]
    fn summary_label_falls_back_to_event_id() -> anyhow::Result<()> {
        let summary = EventSummary {
            event_id: "COSCUP_2019".to_string(),
            display_name: LocalizedText::from_pairs([("en", "COSCUP 2019")]),
            logo_url: Url::parse("https://example.com/logo.png")?,
        };
        assert_eq!(summary.label("en"), "COSCUP 2019");
        assert_eq!(summary.label("zh"), "COSCUP_2019");
        Ok(())
    }
}

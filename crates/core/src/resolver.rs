//! Feature URL template resolution.
//!
//! Templates carry `{name}` placeholders. Only `{public_token}` and `{role}`
//! are recognised; any other placeholder is erased so that manifests written
//! for newer clients still produce a usable URL.

use once_cell::sync::Lazy;
use regex::Regex;
use sha1::{Digest, Sha1};
use tracing::debug;
use url::Url;

use crate::{error::ResolutionFailure, manifest::Feature};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("invalid placeholder regex"));

/// Session data that may be embedded into feature URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Access token already digested for embedding in URLs.
    pub access_token_digest: String,
    /// Role of the authenticated user; empty when unknown.
    pub role: String,
}

impl SessionContext {
    /// Build a context from an already digested token.
    pub fn new(access_token_digest: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            access_token_digest: access_token_digest.into(),
            role: role.into(),
        }
    }

    /// Build a context from a raw access token, digesting it the way the portal
    /// expects `{public_token}` (lowercase hex SHA-1).
    pub fn from_access_token(access_token: &str, role: impl Into<String>) -> Self {
        Self::new(public_token(access_token), role)
    }

    fn placeholder(&self, name: &str) -> &str {
        match name {
            "public_token" => &self.access_token_digest,
            "role" => &self.role,
            _ => "",
        }
    }
}

/// Digest of a raw access token. An empty token digests to an empty string.
pub fn public_token(access_token: &str) -> String {
    if access_token.is_empty() {
        return String::new();
    }
    hex::encode(Sha1::digest(access_token.as_bytes()))
}

/// Replace every placeholder in `template`.
///
/// The template is copied into a fresh buffer in a single left-to-right pass,
/// so substitutions of any length never disturb the offsets of later tokens.
pub fn substitute(template: &str, ctx: &SessionContext) -> String {
    let mut resolved = String::with_capacity(template.len());
    let mut cursor = 0;
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        resolved.push_str(&template[cursor..token.start()]);
        resolved.push_str(ctx.placeholder(name.as_str()));
        cursor = token.end();
    }
    resolved.push_str(&template[cursor..]);
    resolved
}

/// Resolve a template into a URL, reporting why it is unusable.
pub fn try_resolve(template: &str, ctx: &SessionContext) -> Result<Url, ResolutionFailure> {
    let resolved = substitute(template, ctx);
    Url::parse(&resolved).map_err(|err| ResolutionFailure {
        resolved,
        reason: err.to_string(),
    })
}

/// Resolve an optional template. Absent templates and unusable results yield `None`.
pub fn resolve(template: Option<&str>, ctx: &SessionContext) -> Option<Url> {
    let template = template?;
    match try_resolve(template, ctx) {
        Ok(url) => Some(url),
        Err(failure) => {
            debug!(%failure, "Feature URL did not resolve");
            None
        }
    }
}

impl Feature {
    /// Concrete URL for this feature under `ctx`, if it has a usable one.
    pub fn resolve_url(&self, ctx: &SessionContext) -> Option<Url> {
        resolve(self.url_template.as_deref(), ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{tests::sample_document, EventManifest};
    use crate::models::FeatureKind;

    fn ctx() -> SessionContext {
        SessionContext::new("abc123", "staff")
    }

    #[test]
    fn substitutes_webview_template() -> anyhow::Result<()> {
        let manifest = EventManifest::parse(sample_document("SITCON_2019"))?;
        let feature = manifest
            .feature(FeatureKind::WebView)
            .expect("webview feature");
        let url = feature.resolve_url(&ctx()).expect("resolved url");
        assert_eq!(url.as_str(), "https://x/abc123/staff");
        Ok(())
    }

    #[test]
    fn repeated_tokens_of_varying_length() {
        let long = SessionContext::new("0123456789abcdef0123456789abcdef01234567", "r");
        let template = "https://h/{role}/{public_token}?a={role}&b={public_token}&c={role}";
        assert_eq!(
            substitute(template, &long),
            "https://h/r/0123456789abcdef0123456789abcdef01234567?a=r\
             &b=0123456789abcdef0123456789abcdef01234567&c=r"
        );

        let short = SessionContext::new("t", "administrator");
        assert_eq!(
            substitute("{public_token}{role}{public_token}", &short),
            "tadministratort"
        );
    }

    #[test]
    fn unknown_placeholders_are_erased() {
        let url = resolve(Some("https://x/{lang}/page{future_param}?r={role}"), &ctx())
            .expect("still a valid url");
        assert_eq!(url.as_str(), "https://x//page?r=staff");
    }

    #[test]
    fn empty_role_substitutes_empty_string() {
        let ctx = SessionContext::new("abc", "");
        assert_eq!(substitute("https://x/?role={role}", &ctx), "https://x/?role=");
    }

    #[test]
    fn unusable_result_is_absent() {
        assert_eq!(resolve(Some("{public_token}/{role}"), &ctx()), None);
        let failure = try_resolve("{role} only", &ctx()).expect_err("not a url");
        assert_eq!(failure.resolved, "staff only");
        assert_eq!(resolve(None, &ctx()), None);
    }

    #[test]
    fn unterminated_brace_is_literal() {
        assert_eq!(substitute("https://x/{role", &ctx()), "https://x/{role");
        assert_eq!(substitute("https://x/{}", &ctx()), "https://x/{}");
    }

    #[test]
    fn public_token_is_sha1_hex() {
        assert_eq!(public_token(""), "");
        assert_eq!(
            public_token("abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        let ctx = SessionContext::from_access_token("abc", "attendee");
        assert_eq!(ctx.access_token_digest, public_token("abc"));
        assert_eq!(ctx.role, "attendee");
    }
}

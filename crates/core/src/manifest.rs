//! Event manifest model and the strict parse step that produces it.
//!
//! Every field the rest of the crate relies on is validated here, once. Later
//! consumers never traverse the raw document.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;
use url::Url;

use crate::{
    error::ManifestError,
    models::{EventSummary, FeatureKind, LocalizedText},
};

/// Window during which the event is listed by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishWindow {
    /// First instant of the window.
    pub start: DateTime<Utc>,
    /// Last instant of the window.
    pub end: DateTime<Utc>,
}

impl PublishWindow {
    /// Whether `at` falls inside the window, bounds included.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// One actionable capability of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    /// Raw feature identifier as found in the manifest.
    pub kind: String,
    /// Optional custom icon.
    pub icon: Option<Url>,
    /// Localized label.
    pub display_text: LocalizedText,
    /// URL template, possibly containing placeholder tokens.
    pub url_template: Option<String>,
    /// Roles allowed to interact with the feature. `None` means everyone.
    pub visible_roles: Option<BTreeSet<String>>,
}

impl Feature {
    /// Known kind of this feature, if the client recognises it.
    pub fn known_kind(&self) -> Option<FeatureKind> {
        FeatureKind::from_raw(&self.kind)
    }
}

/// Typed, validated view over an event manifest document.
#[derive(Debug, Clone, PartialEq)]
pub struct EventManifest {
    /// Stable event identifier.
    pub event_id: String,
    /// Localized event name.
    pub display_name: LocalizedText,
    /// Event logo.
    pub logo_url: Url,
    /// Listing window.
    pub publish: PublishWindow,
    /// Base URL of the event's own API server.
    pub server_base_url: Url,
    /// Location of the schedule document.
    pub schedule_url: Url,
    /// Features in manifest order.
    pub features: Vec<Feature>,
    document: Value,
}

impl EventManifest {
    /// Parse a manifest from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|err| ManifestError::MalformedDocument(err.to_string()))?;
        Self::parse(document)
    }

    /// Parse a manifest from a decoded JSON document.
    pub fn parse(document: Value) -> Result<Self, ManifestError> {
        let object = as_object(&document, "manifest")?;

        let event_id = required_str(object, "event_id")?.to_string();
        let display_name = localized(object.get("display_name"));
        let logo_url = required_url(object, "logo_url", "logo_url")?;

        let publish = object
            .get("publish")
            .filter(|value| !value.is_null())
            .ok_or_else(|| ManifestError::MissingField("publish".to_string()))?;
        let publish = as_object(publish, "publish")?;
        let publish = PublishWindow {
            start: required_date(publish, "start", "publish.start")?,
            end: required_date(publish, "end", "publish.end")?,
        };

        let server_base_url = required_url(object, "server_base_url", "server_base_url")?;
        let schedule_url = required_url(object, "schedule_url", "schedule_url")?;

        let features = match object.get("features") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| parse_feature(item, index))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ManifestError::MalformedDocument(
                    "`features` must be an array".to_string(),
                ))
            }
        };

        Ok(Self {
            event_id,
            display_name,
            logo_url,
            publish,
            server_base_url,
            schedule_url,
            features,
            document,
        })
    }

    /// The document this manifest was parsed from.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// First feature of the given known kind.
    pub fn feature(&self, kind: FeatureKind) -> Option<&Feature> {
        self.features
            .iter()
            .find(|feature| feature.known_kind() == Some(kind))
    }

    /// Whether the event is inside its publish window at `at`.
    pub fn is_published(&self, at: DateTime<Utc>) -> bool {
        self.publish.contains(at)
    }
}

/// Parse the event list document. Entries without a usable logo are skipped.
pub fn parse_event_list(document: &Value) -> Result<Vec<EventSummary>, ManifestError> {
    let items = document.as_array().ok_or_else(|| {
        ManifestError::MalformedDocument("event list must be an array".to_string())
    })?;

    let mut events = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match parse_summary(item) {
            Ok(summary) => events.push(summary),
            Err(err) => warn!(index, %err, "Skipping event list entry"),
        }
    }
    Ok(events)
}

fn parse_summary(item: &Value) -> Result<EventSummary, ManifestError> {
    let object = as_object(item, "event")?;
    Ok(EventSummary {
        event_id: required_str(object, "event_id")?.to_string(),
        display_name: localized(object.get("display_name")),
        logo_url: required_url(object, "logo_url", "logo_url")?,
    })
}

fn parse_feature(item: &Value, index: usize) -> Result<Feature, ManifestError> {
    let object = as_object(item, &format!("features[{index}]"))?;

    let kind = object
        .get("feature")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // Icons are cosmetic; an unusable one is dropped rather than failing the event.
    let icon = object
        .get("icon")
        .and_then(Value::as_str)
        .and_then(|raw| Url::parse(raw).ok());

    let url_template = object
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string);

    let visible_roles = object
        .get("visible_roles")
        .and_then(Value::as_array)
        .map(|roles| {
            roles
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
        })
        .filter(|roles| !roles.is_empty());

    Ok(Feature {
        kind,
        icon,
        display_text: localized(object.get("display_text")),
        url_template,
        visible_roles,
    })
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ManifestError> {
    value
        .as_object()
        .ok_or_else(|| ManifestError::MalformedDocument(format!("`{what}` must be an object")))
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a str, ManifestError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ManifestError::MissingField(key.to_string()))
}

fn required_url(
    object: &Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<Url, ManifestError> {
    let raw = object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ManifestError::MissingField(field.to_string()))?;
    Url::parse(raw).map_err(|_| ManifestError::MalformedUrl {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn required_date(
    object: &Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<DateTime<Utc>, ManifestError> {
    let raw = object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ManifestError::MissingField(field.to_string()))?;
    parse_iso8601(raw).ok_or_else(|| ManifestError::MalformedDate {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub(crate) fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn localized(value: Option<&Value>) -> LocalizedText {
    let Some(Value::Object(map)) = value else {
        return LocalizedText::default();
    };
    LocalizedText::from_pairs(
        map.iter()
            .filter_map(|(lang, text)| text.as_str().map(|text| (lang.as_str(), text))),
    )
}

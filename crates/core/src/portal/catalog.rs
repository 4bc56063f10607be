//! Cached event list with search.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::{error::ManifestError, manifest::parse_event_list, models::EventSummary};

use super::ManifestClient;

/// Thread-safe cache of the portal's event list.
#[derive(Clone)]
pub struct EventCatalog {
    client: Arc<dyn ManifestClient>,
    cache: Arc<RwLock<Vec<EventSummary>>>,
}

impl EventCatalog {
    /// Build an empty catalog backed by `client`.
    pub fn new(client: Arc<dyn ManifestClient>) -> Self {
        Self {
            client,
            cache: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fetch the event list and replace the cache.
    pub async fn refresh(&self) -> Result<Vec<EventSummary>, ManifestError> {
        let document = self.client.fetch_event_list().await?;
        let events = parse_event_list(&document)?;
        info!(total = events.len(), "Event list refreshed");
        *self.cache.write() = events.clone();
        Ok(events)
    }

    /// Cached events from the last successful refresh.
    pub fn events(&self) -> Vec<EventSummary> {
        self.cache.read().clone()
    }

    /// Filter cached events by a case-insensitive substring of the event id or
    /// any display name.
    pub fn events_matching(&self, query: &str) -> Vec<EventSummary> {
        let needle = query.trim().to_lowercase();
        let events = self.cache.read();
        if needle.is_empty() {
            return events.clone();
        }
        events
            .iter()
            .filter(|event| {
                event.event_id.to_lowercase().contains(&needle)
                    || event.display_name.contains_lowercase(&needle)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;

    struct StaticList(Value);

    #[async_trait]
    impl ManifestClient for StaticList {
        async fn fetch_event_list(&self) -> Result<Value, ManifestError> {
            Ok(self.0.clone())
        }

        async fn fetch_event_document(&self, event_id: &str) -> Result<Value, ManifestError> {
            Err(ManifestError::NetworkFailure(format!("no document for {event_id}")))
        }
    }

    #[tokio::test]
    async fn refresh_and_search() -> anyhow::Result<()> {
        let catalog = EventCatalog::new(Arc::new(StaticList(json!([
            { "event_id": "SITCON_2019", "display_name": { "en": "SITCON 2019", "zh": "學生計算機年會" }, "logo_url": "https://a/l.png" },
            { "event_id": "COSCUP_2019", "display_name": { "en": "COSCUP 2019" }, "logo_url": "https://b/l.png" }
        ]))));
        assert!(catalog.events().is_empty());

        let events = catalog.refresh().await?;
        assert_eq!(events.len(), 2);
        assert_eq!(catalog.events_matching("  ").len(), 2);

        let found = catalog.events_matching("coscup");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_id, "COSCUP_2019");

        let found = catalog.events_matching("計算機");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_id, "SITCON_2019");
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_keeps_cache() -> anyhow::Result<()> {
        let catalog = EventCatalog::new(Arc::new(StaticList(json!({ "error": "down" }))));
        assert!(catalog.refresh().await.is_err());
        assert!(catalog.events().is_empty());
        Ok(())
    }
}

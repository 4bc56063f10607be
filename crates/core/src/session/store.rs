use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::{
    error::SessionError,
    manifest::EventManifest,
    models::UserInfo,
    resolver::SessionContext,
    visibility::FeatureListing,
};

/// Everything the store holds, captured as one value.
///
/// Snapshots are taken before a handshake starts writing and restored if it
/// does not complete.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    current_event_id: String,
    manifest: Option<Arc<EventManifest>>,
    user_info: Option<UserInfo>,
    access_token: String,
    is_authenticated: bool,
}

impl SessionSnapshot {
    /// Event id held when the snapshot was taken.
    pub fn current_event_id(&self) -> &str {
        &self.current_event_id
    }

    /// Whether the snapshot is the empty baseline.
    pub fn is_empty(&self) -> bool {
        self.current_event_id.is_empty()
            && self.manifest.is_none()
            && self.user_info.is_none()
            && self.access_token.is_empty()
            && !self.is_authenticated
    }
}

/// Thread-safe holder of the current event and session.
///
/// Clones share the same state. Every mutation happens under a single write
/// lock, so readers never observe `is_authenticated` without the user info and
/// manifest that justify it.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionSnapshot>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `manifest` as the current event and return the shared copy the
    /// store now holds. Any previous login is dropped.
    pub fn set_event(&self, manifest: EventManifest) -> Arc<EventManifest> {
        let manifest = Arc::new(manifest);
        let mut inner = self.inner.write();
        info!(event_id = %manifest.event_id, "Event selected");
        *inner = SessionSnapshot {
            current_event_id: manifest.event_id.clone(),
            manifest: Some(manifest.clone()),
            ..SessionSnapshot::default()
        };
        manifest
    }

    /// Mark the session as authenticated for `event_id`.
    pub fn authenticate(
        &self,
        event_id: &str,
        user_info: UserInfo,
        access_token: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.write();
        if inner.manifest.is_none() {
            return Err(SessionError::NoEvent);
        }
        if inner.current_event_id != event_id {
            return Err(SessionError::EventMismatch {
                loaded: inner.current_event_id.clone(),
                requested: event_id.to_string(),
            });
        }
        info!(event_id, user_id = %user_info.user_id, role = %user_info.role, "Session authenticated");
        inner.user_info = Some(user_info);
        inner.access_token = access_token.into();
        inner.is_authenticated = true;
        Ok(())
    }

    /// Forget the access token and login state, keeping the loaded event.
    pub fn clear_access_token(&self) {
        let mut inner = self.inner.write();
        inner.access_token.clear();
        inner.is_authenticated = false;
    }

    /// Reset every field to the empty baseline. Repeated calls are no-ops.
    pub fn cleanup(&self) {
        let mut inner = self.inner.write();
        if inner.is_empty() {
            return;
        }
        debug!(event_id = %inner.current_event_id, "Session cleaned up");
        *inner = SessionSnapshot::default();
    }

    /// Capture the full current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().clone()
    }

    /// Replace the full state with a previously captured snapshot.
    pub fn restore(&self, snapshot: SessionSnapshot) {
        *self.inner.write() = snapshot;
    }

    /// Identifier of the loaded event, empty when none.
    pub fn current_event_id(&self) -> String {
        self.inner.read().current_event_id.clone()
    }

    /// The loaded manifest.
    pub fn manifest(&self) -> Option<Arc<EventManifest>> {
        self.inner.read().manifest.clone()
    }

    /// Identity of the logged-in user.
    pub fn user_info(&self) -> Option<UserInfo> {
        self.inner.read().user_info.clone()
    }

    /// Raw access token, empty when not logged in.
    pub fn access_token(&self) -> String {
        self.inner.read().access_token.clone()
    }

    /// Whether a credential has been redeemed for the loaded event.
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_authenticated
    }

    /// Whether the store is at its empty baseline.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Resolution context for the current session.
    pub fn context(&self) -> SessionContext {
        let inner = self.inner.read();
        let role = inner
            .user_info
            .as_ref()
            .map(|user| user.role.clone())
            .unwrap_or_default();
        SessionContext::from_access_token(&inner.access_token, role)
    }

    /// Feature listing of the loaded event for the current session.
    pub fn listing(&self, language: &str) -> Option<FeatureListing> {
        let manifest = self.manifest()?;
        Some(FeatureListing::build(&manifest, &self.context(), language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::tests::sample_document;

    fn manifest(event_id: &str) -> EventManifest {
        EventManifest::parse(sample_document(event_id)).expect("sample manifest")
    }

    fn staff() -> UserInfo {
        UserInfo {
            user_id: "u-42".to_string(),
            role: "staff".to_string(),
        }
    }

    fn assert_baseline(store: &SessionStore) {
        assert_eq!(store.current_event_id(), "");
        assert!(store.manifest().is_none());
        assert!(store.user_info().is_none());
        assert_eq!(store.access_token(), "");
        assert!(!store.is_authenticated());
        assert!(store.is_empty());
        assert_eq!(store.context(), SessionContext::default());
    }

    #[test]
    fn starts_empty() {
        assert_baseline(&SessionStore::new());
    }

    #[test]
    fn cleanup_resets_everything_and_is_idempotent() -> anyhow::Result<()> {
        let store = SessionStore::new();
        store.set_event(manifest("SITCON_2019"));
        store.authenticate("SITCON_2019", staff(), "token")?;
        assert!(store.is_authenticated());

        store.cleanup();
        assert_baseline(&store);
        store.cleanup();
        assert_baseline(&store);
        Ok(())
    }

    #[test]
    fn authentication_requires_loaded_event() {
        let store = SessionStore::new();
        assert_eq!(
            store.authenticate("SITCON_2019", staff(), "token"),
            Err(SessionError::NoEvent)
        );
        assert!(!store.is_authenticated());

        store.set_event(manifest("A"));
        assert_eq!(
            store.authenticate("B", staff(), "token"),
            Err(SessionError::EventMismatch {
                loaded: "A".to_string(),
                requested: "B".to_string(),
            })
        );
        assert!(!store.is_authenticated());
    }

    #[test]
    fn set_event_drops_previous_login() -> anyhow::Result<()> {
        let store = SessionStore::new();
        store.set_event(manifest("A"));
        store.authenticate("A", staff(), "token")?;

        let loaded = store.set_event(manifest("B"));
        assert_eq!(loaded.event_id, "B");
        assert!(store
            .manifest()
            .is_some_and(|held| Arc::ptr_eq(&held, &loaded)));
        assert_eq!(store.current_event_id(), "B");
        assert!(!store.is_authenticated());
        assert!(store.user_info().is_none());
        assert_eq!(store.access_token(), "");
        Ok(())
    }

    #[test]
    fn context_digests_token_and_carries_role() -> anyhow::Result<()> {
        let store = SessionStore::new();
        store.set_event(manifest("A"));
        store.authenticate("A", staff(), "abc")?;
        let ctx = store.context();
        assert_eq!(
            ctx.access_token_digest,
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(ctx.role, "staff");

        let listing = store.listing("en").expect("listing");
        assert_eq!(listing.len(), 4);

        store.clear_access_token();
        assert!(!store.is_authenticated());
        assert_eq!(store.current_event_id(), "A");
        Ok(())
    }

    #[test]
    fn restore_returns_to_snapshot() -> anyhow::Result<()> {
        let store = SessionStore::new();
        store.set_event(manifest("A"));
        store.authenticate("A", staff(), "token")?;
        let snapshot = store.snapshot();

        store.set_event(manifest("B"));
        store.restore(snapshot);
        assert_eq!(store.current_event_id(), "A");
        assert!(store.is_authenticated());
        assert_eq!(store.access_token(), "token");
        Ok(())
    }
}

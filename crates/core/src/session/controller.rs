//! Login / switch-event handshake.
//!
//! A handshake unwinds whatever UI state is presented until the event picker
//! is on top, loads the target event, then redeems the credential. The store
//! is snapshotted before the first write and restored unless the handshake
//! reaches `Authenticated`.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::{CredentialError, HandshakeError, ManifestError, NavigationError},
    manifest::EventManifest,
    models::UserInfo,
    persist::LastEventState,
    portal::ManifestClient,
};

use super::{redeem::CredentialRedeemer, store::SessionSnapshot, SessionStore};

/// Opaque identifier of a presented UI state.
pub type StateId = String;

/// UI navigation collaborator driven while unwinding.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Identifier of the topmost presented state.
    async fn current_state_id(&self) -> StateId;

    /// Whether `state` is the event picker the unwind loop stops at.
    fn is_baseline(&self, state: &StateId) -> bool;

    /// Dismiss the topmost presented state. Resolves once the dismissal has
    /// completed.
    async fn dismiss_top(&self) -> Result<(), NavigationError>;
}

/// Observable state of the most recent handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    /// No handshake has run, or the last one was abandoned.
    Idle,
    /// Dismissing presented UI state.
    Unwinding,
    /// Fetching the target event manifest.
    LoadingEvent,
    /// Submitting the credential.
    Redeeming,
    /// The session is authenticated.
    Authenticated,
    /// The handshake failed; the store holds its pre-handshake state.
    Failed(HandshakeError),
}

impl HandshakeState {
    /// Whether the handshake has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandshakeState::Authenticated | HandshakeState::Failed(_))
    }
}

/// Drives handshakes against a shared [`SessionStore`].
pub struct SessionController {
    store: SessionStore,
    client: Arc<dyn ManifestClient>,
    redeemer: Arc<dyn CredentialRedeemer>,
    navigator: Arc<dyn Navigator>,
    last_event: Option<LastEventState>,
    request_timeout: Duration,
    generation: AtomicU64,
    handshake: Mutex<()>,
    state: watch::Sender<HandshakeState>,
}

impl SessionController {
    /// Create a controller. Network calls that exceed `request_timeout` fail
    /// the handshake.
    pub fn new(
        store: SessionStore,
        client: Arc<dyn ManifestClient>,
        redeemer: Arc<dyn CredentialRedeemer>,
        navigator: Arc<dyn Navigator>,
        request_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(HandshakeState::Idle);
        Self {
            store,
            client,
            redeemer,
            navigator,
            last_event: None,
            request_timeout,
            generation: AtomicU64::new(0),
            handshake: Mutex::new(()),
            state,
        }
    }

    /// Record authenticated events in `state`.
    pub fn with_last_event(mut self, state: LastEventState) -> Self {
        self.last_event = Some(state);
        self
    }

    /// The store this controller writes to.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Current handshake state.
    pub fn state(&self) -> HandshakeState {
        self.state.borrow().clone()
    }

    /// Watch handshake state transitions.
    pub fn subscribe(&self) -> watch::Receiver<HandshakeState> {
        self.state.subscribe()
    }

    /// Log in to `event_id` with `credential`, superseding any handshake in
    /// progress.
    pub async fn login(
        &self,
        event_id: &str,
        credential: &str,
    ) -> Result<UserInfo, HandshakeError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _serial = self.handshake.lock().await;
        info!(event_id, generation, "Handshake started");

        let mut rollback = Rollback::new(&self.store, &self.state);
        match self.run(generation, event_id, credential).await {
            Ok((user, manifest)) => {
                rollback.commit();
                self.publish(HandshakeState::Authenticated);
                info!(event_id, user_id = %user.user_id, "Handshake authenticated");
                if let Some(last_event) = &self.last_event {
                    if let Err(err) = last_event.record(&manifest) {
                        warn!(?err, "Failed to record last event");
                    }
                }
                Ok(user)
            }
            Err(err) => {
                rollback.restore();
                warn!(event_id, %err, "Handshake failed");
                self.publish(HandshakeState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Load `event_id` without logging in, superseding any handshake in
    /// progress.
    pub async fn open_event(&self, event_id: &str) -> Result<Arc<EventManifest>, ManifestError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _serial = self.handshake.lock().await;
        let manifest = self.load_event(event_id).await?;
        let manifest = self.store.set_event(manifest);
        if let Some(last_event) = &self.last_event {
            if let Err(err) = last_event.record(&manifest) {
                warn!(?err, "Failed to record last event");
            }
        }
        Ok(manifest)
    }

    /// Leave the current event: clear the session and forget the last event.
    ///
    /// Supersedes any handshake in progress and waits for it to roll back
    /// first, so the cleared store stays cleared.
    pub async fn leave_event(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _serial = self.handshake.lock().await;
        self.store.cleanup();
        if let Some(last_event) = &self.last_event {
            if let Err(err) = last_event.forget() {
                warn!(?err, "Failed to forget last event");
            }
        }
    }

    /// Reopen the last recorded event, unauthenticated.
    pub async fn restore_last_event(&self) -> Option<String> {
        let last_event = self.last_event.as_ref()?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _serial = self.handshake.lock().await;
        match last_event.restore(&self.store) {
            Ok(event_id) => event_id,
            Err(err) => {
                warn!(?err, "Failed to restore last event");
                None
            }
        }
    }

    async fn run(
        &self,
        generation: u64,
        event_id: &str,
        credential: &str,
    ) -> Result<(UserInfo, Arc<EventManifest>), HandshakeError> {
        self.publish(HandshakeState::Unwinding);
        self.unwind(generation).await?;
        self.store.clear_access_token();

        self.checkpoint(generation)?;
        self.publish(HandshakeState::LoadingEvent);
        let manifest = self.load_event(event_id).await?;
        self.checkpoint(generation)?;
        let manifest = self.store.set_event(manifest);

        self.publish(HandshakeState::Redeeming);
        let user = self.redeem(&manifest, credential).await?;
        self.checkpoint(generation)?;
        self.store
            .authenticate(&manifest.event_id, user.clone(), credential)?;
        Ok((user, manifest))
    }

    async fn unwind(&self, generation: u64) -> Result<(), HandshakeError> {
        let mut dismissed = 0usize;
        loop {
            self.checkpoint(generation)?;
            let current = self.navigator.current_state_id().await;
            if self.navigator.is_baseline(&current) {
                debug!(dismissed, "Unwound to event picker");
                return Ok(());
            }
            debug!(state = %current, "Dismissing presented state");
            self.navigator.dismiss_top().await?;
            dismissed += 1;
        }
    }

    async fn load_event(&self, event_id: &str) -> Result<EventManifest, ManifestError> {
        let document = with_timeout(
            self.request_timeout,
            self.client.fetch_event_document(event_id),
            ManifestError::NetworkFailure,
        )
        .await?;
        let manifest = EventManifest::parse(document)?;
        if manifest.event_id != event_id {
            warn!(requested = event_id, received = %manifest.event_id, "Portal returned a different event id");
        }
        Ok(manifest)
    }

    async fn redeem(
        &self,
        manifest: &EventManifest,
        credential: &str,
    ) -> Result<UserInfo, CredentialError> {
        with_timeout(
            self.request_timeout,
            self.redeemer.redeem(manifest, credential),
            CredentialError::NetworkFailure,
        )
        .await
    }

    fn checkpoint(&self, generation: u64) -> Result<(), HandshakeError> {
        if self.generation.load(Ordering::SeqCst) == generation {
            Ok(())
        } else {
            debug!(generation, "Handshake superseded");
            Err(HandshakeError::Superseded)
        }
    }

    fn publish(&self, state: HandshakeState) {
        self.state.send_replace(state);
    }
}

async fn with_timeout<T, E>(
    limit: Duration,
    call: impl Future<Output = Result<T, E>>,
    on_elapsed: impl FnOnce(String) -> E,
) -> Result<T, E> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed(format!("timed out after {limit:?}"))),
    }
}

/// Restores the pre-handshake snapshot unless committed.
///
/// Dropping an uncommitted guard (the handshake future was abandoned) also
/// resets the published state to `Idle`.
struct Rollback<'a> {
    store: &'a SessionStore,
    state: &'a watch::Sender<HandshakeState>,
    snapshot: Option<SessionSnapshot>,
}

impl<'a> Rollback<'a> {
    fn new(store: &'a SessionStore, state: &'a watch::Sender<HandshakeState>) -> Self {
        Self {
            store,
            state,
            snapshot: Some(store.snapshot()),
        }
    }

    fn commit(&mut self) {
        self.snapshot = None;
    }

    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.store.restore(snapshot);
        }
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        if self.snapshot.is_some() {
            self.restore();
            debug!("Abandoned handshake rolled back");
            self.state.send_if_modified(|state| {
                if state.is_terminal() {
                    false
                } else {
                    *state = HandshakeState::Idle;
                    true
                }
            });
        }
    }
}

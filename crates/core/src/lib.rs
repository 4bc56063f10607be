#![warn(clippy::all, missing_docs)]

//! Core logic for the OPass event client.
//!
//! This crate hosts the event manifest model, feature URL resolution,
//! role visibility, the session store and the login handshake used by
//! the terminal UI and any future frontends.

pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod persist;
pub mod portal;
pub mod resolver;
pub mod session;
pub mod visibility;

pub use config::AppConfig;
pub use error::{
    CredentialError, HandshakeError, ManifestError, NavigationError, ResolutionFailure,
    SessionError,
};
pub use manifest::{EventManifest, Feature, PublishWindow};
pub use models::{EventSummary, FeatureKind, LocalizedText, UserInfo};
pub use persist::LastEventState;
pub use portal::{EventCatalog, ManifestClient, PortalClient};
pub use resolver::{resolve, SessionContext};
pub use session::{
    CredentialRedeemer, HandshakeState, Navigator, SessionController, SessionStore, StateId,
    StatusRedeemer,
};
pub use visibility::{is_visible, FeatureEntry, FeatureListing};

//! Typed failures surfaced by manifest parsing, credential redemption and the
//! session handshake.

use thiserror::Error;

/// Reasons an event manifest could not be fetched or parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManifestError {
    /// A required field was absent from the document.
    #[error("manifest is missing required field `{0}`")]
    MissingField(String),
    /// A URL field was present but did not parse.
    #[error("manifest field `{field}` is not a valid URL: {value:?}")]
    MalformedUrl {
        /// Dotted path of the offending field.
        field: String,
        /// Raw value found in the document.
        value: String,
    },
    /// A publish date was not ISO-8601.
    #[error("manifest field `{field}` is not an ISO-8601 date: {value:?}")]
    MalformedDate {
        /// Dotted path of the offending field.
        field: String,
        /// Raw value found in the document.
        value: String,
    },
    /// The document was not a JSON object or could not be decoded.
    #[error("manifest document is malformed: {0}")]
    MalformedDocument(String),
    /// Transport failure, non-success status or timeout.
    #[error("failed to fetch manifest: {0}")]
    NetworkFailure(String),
}

/// Reasons a credential could not be redeemed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The service rejected the credential.
    #[error("credential was rejected")]
    Invalid,
    /// The credential was valid once but has expired.
    #[error("credential has expired")]
    Expired,
    /// Transport failure, unexpected response or timeout.
    #[error("failed to redeem credential: {0}")]
    NetworkFailure(String),
}

/// Raised when a feature URL template does not produce a usable URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("resolved feature URL {resolved:?} is not valid: {reason}")]
pub struct ResolutionFailure {
    /// Template after placeholder substitution.
    pub resolved: String,
    /// Parser message.
    pub reason: String,
}

/// Violations of the session store lifecycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Authentication requires a loaded manifest.
    #[error("no event is loaded")]
    NoEvent,
    /// Authentication must target the loaded event.
    #[error("session is for event `{loaded}`, not `{requested}`")]
    EventMismatch {
        /// Event currently held by the store.
        loaded: String,
        /// Event the caller tried to authenticate against.
        requested: String,
    },
}

/// Failure reported by the navigation collaborator while unwinding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("navigation failed: {0}")]
pub struct NavigationError(pub String);

/// Outcome of a failed login/switch-event handshake.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandshakeError {
    /// The target event manifest could not be loaded.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// The credential could not be redeemed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// The presented UI state could not be unwound.
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    /// The store refused the update.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// A newer request took over before this one finished.
    #[error("handshake superseded by a newer request")]
    Superseded,
}

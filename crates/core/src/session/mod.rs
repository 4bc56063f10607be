//! Session state and the login handshake that establishes it.

pub mod controller;
pub mod redeem;
mod store;

pub use controller::{HandshakeState, Navigator, SessionController, StateId};
pub use redeem::{CredentialRedeemer, StatusRedeemer};
pub use store::{SessionSnapshot, SessionStore};

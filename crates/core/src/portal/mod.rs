//! Event portal access.

pub mod catalog;
pub mod client;

pub use catalog::EventCatalog;
pub use client::{ManifestClient, PortalClient};

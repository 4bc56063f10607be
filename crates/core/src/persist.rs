//! Persistence of the last selected event.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{manifest::EventManifest, session::SessionStore};

/// File name used under the application config directory.
pub const DEFAULT_STATE_FILE: &str = "opass/last_event.json";

/// Serialized record of the last selected event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedEvent {
    /// Identifier of the event.
    pub event_id: String,
    /// Manifest document exactly as fetched.
    pub document: Value,
    /// When the record was written.
    pub saved_at: DateTime<Utc>,
}

/// Reads and writes the last-event record.
#[derive(Debug, Clone)]
pub struct LastEventState {
    path: PathBuf,
}

impl LastEventState {
    /// Create a state file handle at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_STATE_FILE)
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, returning `None` if it does not exist.
    pub fn load(&self) -> Result<Option<SavedEvent>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let saved = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(saved))
    }

    /// Record `manifest` as the last selected event.
    pub fn record(&self, manifest: &EventManifest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let saved = SavedEvent {
            event_id: manifest.event_id.clone(),
            document: manifest.document().clone(),
            saved_at: Utc::now(),
        };
        let serialized =
            serde_json::to_vec_pretty(&saved).context("failed to serialize last event")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(event_id = %saved.event_id, "Last event recorded");
        Ok(())
    }

    /// Remove the record. A missing file is not an error.
    pub fn forget(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }

    /// Load the recorded event into `store`, unauthenticated.
    ///
    /// Returns the restored event id. A record whose document no longer parses
    /// is discarded.
    pub fn restore(&self, store: &SessionStore) -> Result<Option<String>> {
        let Some(saved) = self.load()? else {
            return Ok(None);
        };
        match EventManifest::parse(saved.document) {
            Ok(manifest) => {
                let manifest = store.set_event(manifest);
                Ok(Some(manifest.event_id.clone()))
            }
            Err(err) => {
                warn!(event_id = %saved.event_id, %err, "Discarding unusable last event");
                self.forget()?;
                Ok(None)
            }
        }
    }
}

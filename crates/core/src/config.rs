//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` in the user's
//! config directory, then `OPASS_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::persist::LastEventState;

/// Directory under the user's config directory holding our files.
pub const CONFIG_DIR: &str = "opass";
/// Portal used when none is configured.
pub const DEFAULT_PORTAL_URL: &str = "https://portal.opass.app/";

const DEFAULT_CONFIG: &str = r#"# OPass client configuration.
# Every key may also be set through an OPASS_<KEY> environment variable.

# Event portal serving /events/ and /events/<id>/.
portal_url = "https://portal.opass.app/"

# Language code used for display names and feature labels.
language = "en"

# Seconds before a portal or redemption request is abandoned.
request_timeout_secs = 15
"#;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Event portal base URL.
    pub portal_url: Url,
    /// Preferred display language.
    pub language: String,
    /// Network timeout in seconds.
    pub request_timeout_secs: u64,
    /// Where the last selected event is persisted.
    pub state_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            portal_url: Url::parse(DEFAULT_PORTAL_URL).expect("default portal url is valid"),
            language: "en".to_string(),
            request_timeout_secs: 15,
            state_path: LastEventState::default_path(),
        }
    }
}

impl AppConfig {
    /// Default location of `config.toml`.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join("config.toml")
    }

    /// Load configuration from the default location and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path` (optional) and the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("portal_url", defaults.portal_url.as_str())?
            .set_default("language", defaults.language.as_str())?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("state_path", defaults.state_path.display().to_string())?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("OPASS"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config: Self = settings
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(config)
    }

    /// Network timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Write a commented default `config.toml` if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = AppConfig::config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(&dir.path().join("absent.toml"))?;
        assert_eq!(config.portal_url.as_str(), DEFAULT_PORTAL_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        Ok(())
    }

    #[test]
    fn file_overrides_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "portal_url = \"https://portal.example.com/\"\nlanguage = \"zh\"\nrequest_timeout_secs = 0\n",
        )?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.portal_url.as_str(), "https://portal.example.com/");
        assert_eq!(config.language, "zh");
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn default_file_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("opass/config.toml");
        write_default_config(&path)?;
        fs::write(&path, "language = \"ja\"\n")?;
        write_default_config(&path)?;
        assert_eq!(AppConfig::load_from(&path)?.language, "ja");

        let fresh = dir.path().join("fresh/config.toml");
        write_default_config(&fresh)?;
        assert_eq!(AppConfig::load_from(&fresh)?.language, "en");
        Ok(())
    }
}

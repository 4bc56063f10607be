mod app;
mod navigator;

use std::{
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use clap::Parser;
use opass_core::{
    config::{self, AppConfig},
    PortalClient, StatusRedeemer,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Terminal client for OPass events.
#[derive(Debug, Parser)]
#[command(name = "opass", version, about)]
struct Cli {
    /// Log in to this event on startup.
    #[arg(long, requires = "token")]
    event: Option<String>,

    /// Access token redeemed for `--event`.
    #[arg(long, requires = "event")]
    token: Option<String>,

    /// Override the configured display language.
    #[arg(long)]
    language: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    config::ensure_default_config()?;
    let mut config = AppConfig::load()?;
    if let Some(language) = cli.language {
        config.language = language;
    }
    info!(portal = %config.portal_url, language = %config.language, "Starting");

    let client = PortalClient::new(&config.portal_url, config.request_timeout())
        .context("invalid portal_url")?;
    let redeemer =
        StatusRedeemer::new(config.request_timeout()).context("failed to build http client")?;

    let mut app = app::OPassApp::new(config, Arc::new(client), Arc::new(redeemer));
    if let (Some(event_id), Some(token)) = (cli.event, cli.token) {
        app.queue_login(event_id, token);
    }
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("opass.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the UI, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}

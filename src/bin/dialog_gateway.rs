//! Standalone gateway process holding the provider keys
//!
//! `PORT` sets the listen port (default 3001), `DIALOG_CONFIG` optionally points
//! at a TOML file whose `[gateway]` table overrides the provider endpoints.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use agent_dialog::config::DialogConfig;
use agent_dialog::gateway::EnvCredentials;
use agent_dialog::server::{self, GatewayState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("DIALOG_CONFIG") {
        Ok(path) => DialogConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        Err(_) => DialogConfig::default(),
    };

    let port = match std::env::var("PORT") {
        Ok(value) => value
            .parse::<u16>()
            .with_context(|| format!("invalid PORT '{value}'"))?,
        Err(_) => 3001,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let state = Arc::new(GatewayState::new(config.gateway, Arc::new(EnvCredentials)));
    server::run(addr, state)
        .await
        .context("gateway runtime failed")
}

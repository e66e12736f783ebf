//! # Relay Server
//!
//! Realtime chat relay: HTTP endpoints for sending and presence, a
//! Server-Sent Events stream, and a WebSocket endpoint.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! relay
//!
//! # Run with environment overrides
//! RELAY_PORT=7000 RELAY_HOST=0.0.0.0 relay
//! ```
//!
//! A `relay.toml` in the working directory, `/etc/relay/` or
//! `~/.config/relay/` is picked up automatically.

mod config;
mod error;
mod handlers;
mod metrics;
mod socket;
mod wire;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay=debug,tenvis_relay_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::load()?;

    tracing::info!("Starting Relay server on {}:{}", config.host, config.port);

    metrics::init_metrics();

    handlers::run_server(config).await?;

    Ok(())
}

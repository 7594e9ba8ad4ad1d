//! ops-relay
//!
//! Streams administrative operations of a storage cluster to WebSocket clients.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                      OPS RELAY                        │
//!                        │                                                       │
//!   Client (WebSocket)   │  ┌─────────┐    ┌────────────┐    ┌───────────────┐   │
//!   ─────────────────────┼─▶│  http   │───▶│ operations │───▶│    cluster    │◀──┼──── Storage
//!                        │  │ upgrade │    │   parse    │    │ ClusterAdmin  │   │     cluster
//!                        │  └────┬────┘    └─────┬──────┘    └───────┬───────┘   │
//!                        │       │               │                   │           │
//!                        │       ▼               ▼                   ▼           │
//!                        │  ┌─────────┐    ┌────────────┐    ┌───────────────┐   │
//!   ◀────────────────────┼──│  sink   │◀───│   relay    │◀───│ trace filter  │   │
//!                        │  └─────────┘    └─────▲──────┘    │ heal aggreg.  │   │
//!                        │  ┌─────────┐          │           └───────────────┘   │
//!   ─────── close ───────┼─▶│watchdog │── cancel ┘                               │
//!                        │  └─────────┘                                          │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ops_relay::config::{load_config, RelayConfig};
use ops_relay::lifecycle::startup;
use ops_relay::observability::logging;

#[derive(Parser)]
#[command(name = "ops-relay")]
#[command(about = "Relay storage cluster admin streams over WebSocket", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ops-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cluster = %config.cluster.endpoint,
        heal_poll_interval_ms = config.stream.heal_poll_interval_ms,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (metrics, signal handling)
//! - Bind the listener and begin accepting sessions
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::cluster::RemoteCluster;
use crate::config::RelayConfig;
use crate::http::HttpServer;
use crate::lifecycle::signals;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid cluster endpoint: {0}")]
    ClusterEndpoint(#[from] url::ParseError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Start every subsystem and serve until a termination signal arrives.
pub async fn run(config: RelayConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let cluster = Arc::new(RemoteCluster::new(&config.cluster)?);
    tracing::info!(
        endpoint = %config.cluster.endpoint,
        authenticated = config.cluster.access_token.is_some(),
        call_timeout_secs = config.cluster.call_timeout_secs,
        "Cluster client ready"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = CancellationToken::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, cluster);
    server.run(listener, shutdown).await?;
    Ok(())
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Cancel every live session on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::cluster::ClusterAdmin;
use crate::config::RelayConfig;
use crate::http::websocket;
use crate::operations::RunSettings;
use crate::stream::SessionTracker;

/// How long shutdown waits for sessions to send their close frames.
const SESSION_DRAIN_LIMIT: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub cluster: Arc<dyn ClusterAdmin>,
    pub settings: Arc<RunSettings>,
    pub sessions: SessionTracker,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
    sessions: SessionTracker,
}

impl HttpServer {
    /// Create a new HTTP server relaying from `cluster`.
    pub fn new(config: RelayConfig, cluster: Arc<dyn ClusterAdmin>) -> Self {
        let sessions = SessionTracker::new();
        let state = AppState {
            cluster,
            settings: Arc::new(RunSettings::from_config(&config)),
            sessions: sessions.clone(),
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/ws/{*operation}", get(websocket::stream_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` is cancelled.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            cluster = %self.config.cluster.endpoint,
            "HTTP server starting"
        );

        let sessions = self.sessions.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!(
                    active_sessions = sessions.active_count(),
                    "Shutdown signal received, cancelling sessions"
                );
                sessions.cancel_all();
            })
            .await?;

        if !self.sessions.drain(SESSION_DRAIN_LIMIT).await {
            tracing::warn!(
                remaining = self.sessions.active_count(),
                "Sessions still open after drain limit"
            );
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "activeSessions": state.sessions.active_count(),
    }))
}

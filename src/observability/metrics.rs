//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ops_relay_sessions_total` (counter): sessions started, by operation
//! - `ops_relay_sessions_active` (gauge): sessions currently streaming
//! - `ops_relay_session_duration_seconds` (histogram): by operation and outcome
//! - `ops_relay_messages_total` (counter): frames relayed, by operation
//! - `ops_relay_requests_rejected_total` (counter): malformed requests, by operation
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Outcome label is one of `ok`, `timeout`, `error`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_session_started(operation: &'static str) {
    counter!("ops_relay_sessions_total", "operation" => operation).increment(1);
    gauge!("ops_relay_sessions_active").increment(1.0);
}

pub fn record_session_finished(operation: &'static str, outcome: &'static str, started: Instant) {
    gauge!("ops_relay_sessions_active").decrement(1.0);
    histogram!(
        "ops_relay_session_duration_seconds",
        "operation" => operation,
        "outcome" => outcome
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_message_relayed(operation: &'static str) {
    counter!("ops_relay_messages_total", "operation" => operation).increment(1);
}

pub fn record_request_rejected(operation: &'static str) {
    counter!("ops_relay_requests_rejected_total", "operation" => operation).increment(1);
}

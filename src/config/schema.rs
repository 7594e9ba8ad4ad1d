//! Configuration schema definitions.
//!
//! Every section and field has a default, so an empty file is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Storage cluster the operations are relayed from.
    pub cluster: ClusterConfig,

    /// Stream pacing.
    pub stream: StreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9090").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Storage cluster connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Base URL of the cluster (e.g., "http://127.0.0.1:9000").
    pub endpoint: String,

    /// Path prefix of the admin API.
    pub admin_prefix: String,

    /// Bearer identity forwarded with every call.
    pub access_token: Option<String>,

    /// Limit for one-shot admin calls in seconds.
    pub call_timeout_secs: u64,

    /// Records buffered between a cluster stream and its session.
    pub stream_buffer: usize,
}

impl ClusterConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".to_string(),
            admin_prefix: "/minio/admin/v3".to_string(),
            access_token: None,
            call_timeout_secs: 20,
            stream_buffer: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Heal status polling interval in milliseconds.
    pub heal_poll_interval_ms: u64,
}

impl StreamConfig {
    pub fn heal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.heal_poll_interval_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heal_poll_interval_ms: 1000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9464".to_string(),
        }
    }
}

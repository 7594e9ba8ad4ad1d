//! Storage cluster admin client subsystem.
//!
//! # Data Flow
//! ```text
//! operation (trace / console / heal / health-info / watch)
//!     → ClusterAdmin (injected; RemoteCluster in production)
//!     → remote.rs (HTTP request to the cluster admin API)
//!     → json_lines.rs (decode streamed records)
//!     → EventStream<T> (bounded channel consumed by the relay)
//! ```
//!
//! # Design Decisions
//! - Streaming calls return a channel; the spawned reader stops when the
//!   session token is cancelled or the receiver is dropped
//! - One-shot heal calls return plain results; callers apply the timeout
//! - Identity is a pre-established bearer token forwarded as-is

pub mod json_lines;
pub mod remote;
pub mod types;

#[cfg(test)]
pub mod testing;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::heal::types::{HealRequest, HealStartSuccess, HealTaskStatus};
use crate::stream::{EventStream, SourceError};
use crate::trace::{TraceInfo, TraceOptions};

pub use remote::RemoteCluster;
pub use types::{LogInfo, LogKind, LogOptions, WatchEvent, WatchOptions};

/// Administrative operations offered by a storage cluster.
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    /// Stream traced calls.
    async fn trace(&self, cancel: CancellationToken, opts: &TraceOptions) -> Result<EventStream<TraceInfo>, SourceError>;

    /// Tail server logs.
    async fn console_log(&self, cancel: CancellationToken, opts: &LogOptions) -> Result<EventStream<LogInfo>, SourceError>;

    /// Collect health diagnostics, finishing within `deadline`.
    async fn health_info(&self, cancel: CancellationToken, deadline: Duration) -> Result<EventStream<Value>, SourceError>;

    /// Stream bucket notifications.
    async fn watch_bucket(&self, cancel: CancellationToken, opts: &WatchOptions) -> Result<EventStream<Value>, SourceError>;

    /// Start (or force-start / force-stop) a heal sequence.
    async fn heal_start(&self, request: &HealRequest) -> Result<HealStartSuccess, SourceError>;

    /// Fetch the next status batch of a running heal sequence.
    async fn heal_status(&self, bucket: &str, prefix: &str, client_token: &str) -> Result<HealTaskStatus, SourceError>;
}

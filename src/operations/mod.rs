//! Operation dispatch.
//!
//! # Data Flow
//! ```text
//! /ws/{operation}[/{bucket}]?query
//!     → OperationRequest::parse (RequestError → HTTP 400 before upgrade)
//!     → OperationRequest::run
//!         → open the source on the cluster (trace / console / health-info / watch)
//!           or start a heal sequence
//!         → relay::run / relay::run_polling into the session sink
//! ```
//!
//! # Design Decisions
//! - The set of operations is closed: one enum variant per kind
//! - Requests are immutable once parsed
//! - Each kind owns its parse, transform and run functions

pub mod console;
pub mod heal;
pub mod health_info;
pub mod params;
pub mod trace;
pub mod watch;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cluster::ClusterAdmin;
use crate::config::RelayConfig;
use crate::heal::HealRequest;
use crate::stream::{EventStream, RelayError, Sink, SourceError};

pub use console::ConsoleRequest;
pub use health_info::HealthInfoRequest;
pub use params::{QueryParams, RequestError};
pub use trace::TraceRequest;
pub use watch::WatchRequest;

/// Operation kinds exposed under `/ws/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Trace,
    Console,
    Heal,
    HealthInfo,
    Watch,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Trace => "trace",
            OperationKind::Console => "console",
            OperationKind::Heal => "heal",
            OperationKind::HealthInfo => "health-info",
            OperationKind::Watch => "watch",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "trace" => Some(OperationKind::Trace),
            "console" => Some(OperationKind::Console),
            "heal" => Some(OperationKind::Heal),
            "health-info" => Some(OperationKind::HealthInfo),
            "watch" => Some(OperationKind::Watch),
            _ => None,
        }
    }

    /// Kind named by the first segment of an operation path.
    pub fn from_path(path: &str) -> Option<Self> {
        Self::parse(path.trim_start_matches('/').split('/').next().unwrap_or_default())
    }

    fn takes_bucket(&self) -> bool {
        matches!(self, OperationKind::Heal | OperationKind::Watch)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-server settings that shape how operations run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub call_timeout: Duration,
    pub heal_poll_interval: Duration,
}

impl RunSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            call_timeout: config.cluster.call_timeout(),
            heal_poll_interval: config.stream.heal_poll_interval(),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// A validated operation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Trace(TraceRequest),
    ConsoleLog(ConsoleRequest),
    Heal(HealRequest),
    HealthInfo(HealthInfoRequest),
    Watch(WatchRequest),
}

impl OperationRequest {
    /// Parse an operation path (`heal/photos`) and its raw query string.
    pub fn parse(path: &str, query: Option<&str>) -> Result<Self, RequestError> {
        let path = path.trim_matches('/');
        let (name, rest) = path.split_once('/').unwrap_or((path, ""));
        let kind = OperationKind::parse(name).ok_or_else(|| RequestError::UnknownOperation(path.to_string()))?;

        if !kind.takes_bucket() && !rest.is_empty() {
            return Err(RequestError::UnknownOperation(path.to_string()));
        }
        let params = QueryParams::parse(query);

        match kind {
            OperationKind::Trace => TraceRequest::parse(&params).map(OperationRequest::Trace),
            OperationKind::Console => ConsoleRequest::parse(&params).map(OperationRequest::ConsoleLog),
            OperationKind::HealthInfo => HealthInfoRequest::parse(&params).map(OperationRequest::HealthInfo),
            OperationKind::Heal => heal::parse(bucket(rest)?, &params).map(OperationRequest::Heal),
            OperationKind::Watch => WatchRequest::parse(bucket(rest)?, &params).map(OperationRequest::Watch),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Trace(_) => OperationKind::Trace,
            OperationRequest::ConsoleLog(_) => OperationKind::Console,
            OperationRequest::Heal(_) => OperationKind::Heal,
            OperationRequest::HealthInfo(_) => OperationKind::HealthInfo,
            OperationRequest::Watch(_) => OperationKind::Watch,
        }
    }

    /// Run the operation until it ends or `cancel` fires.
    pub async fn run(
        &self,
        cluster: &dyn ClusterAdmin,
        cancel: &CancellationToken,
        sink: &mut dyn Sink,
        settings: &RunSettings,
    ) -> Result<(), RelayError> {
        match self {
            OperationRequest::Trace(request) => request.run(cluster, cancel, sink).await,
            OperationRequest::ConsoleLog(request) => request.run(cluster, cancel, sink).await,
            OperationRequest::Heal(request) => heal::run(request, cluster, cancel, sink, settings).await,
            OperationRequest::HealthInfo(request) => request.run(cluster, cancel, sink).await,
            OperationRequest::Watch(request) => request.run(cluster, cancel, sink).await,
        }
    }
}

fn bucket(segment: &str) -> Result<&str, RequestError> {
    if segment.is_empty() {
        return Err(RequestError::MissingBucket);
    }
    if segment.contains('/') {
        return Err(RequestError::InvalidBucket(segment.to_string()));
    }
    Ok(segment)
}

/// Open a source unless the session is cancelled first. `None` means cancelled.
pub(crate) async fn open<T, F>(cancel: &CancellationToken, source: F) -> Result<Option<EventStream<T>>, SourceError>
where
    F: Future<Output = Result<EventStream<T>, SourceError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(None),
        opened = source => opened.map(Some),
    }
}

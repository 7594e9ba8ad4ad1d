//! Scripted cluster used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cluster::{ClusterAdmin, LogInfo, LogOptions, WatchOptions};
use crate::heal::types::{HealRequest, HealStartSuccess, HealTaskStatus};
use crate::stream::{EventStream, SourceError};
use crate::trace::{TraceInfo, TraceOptions};

#[derive(Default)]
pub struct ScriptedCluster {
    /// Result of the start call; `None` succeeds with token "token-1".
    pub heal_start_result: Mutex<Option<Result<HealStartSuccess, SourceError>>>,
    /// Status batches returned in order; once empty, "running" with no items.
    pub heal_batches: Mutex<VecDeque<Result<HealTaskStatus, SourceError>>>,
    /// Delay applied to each status call.
    pub status_delay: Option<Duration>,
    pub heal_start_calls: AtomicUsize,
    pub heal_status_calls: AtomicUsize,
    pub last_heal_request: Mutex<Option<HealRequest>>,

    pub trace_records: Mutex<Vec<Result<TraceInfo, SourceError>>>,
    pub log_records: Mutex<Vec<Result<LogInfo, SourceError>>>,
    pub raw_records: Mutex<Vec<Result<Value, SourceError>>>,
    pub last_trace: Mutex<Option<TraceOptions>>,
    pub last_logs: Mutex<Option<LogOptions>>,
    pub last_deadline: Mutex<Option<Duration>>,
    pub last_watch: Mutex<Option<WatchOptions>>,
}

impl ScriptedCluster {
    pub fn with_batches(batches: Vec<HealTaskStatus>) -> Self {
        let cluster = Self::default();
        *cluster.heal_batches.lock().unwrap() = batches.into_iter().map(Ok).collect();
        cluster
    }

    pub fn status_calls(&self) -> usize {
        self.heal_status_calls.load(Ordering::SeqCst)
    }
}

/// Closed channel pre-filled with `items`.
fn replay<T: Send + 'static>(items: Vec<Result<T, SourceError>>) -> EventStream<T> {
    let (tx, rx) = mpsc::channel(items.len().max(1));
    for item in items {
        let _ = tx.try_send(item);
    }
    rx
}

#[async_trait]
impl ClusterAdmin for ScriptedCluster {
    async fn trace(&self, _cancel: CancellationToken, opts: &TraceOptions) -> Result<EventStream<TraceInfo>, SourceError> {
        *self.last_trace.lock().unwrap() = Some(opts.clone());
        Ok(replay(std::mem::take(&mut *self.trace_records.lock().unwrap())))
    }

    async fn console_log(&self, _cancel: CancellationToken, opts: &LogOptions) -> Result<EventStream<LogInfo>, SourceError> {
        *self.last_logs.lock().unwrap() = Some(opts.clone());
        Ok(replay(std::mem::take(&mut *self.log_records.lock().unwrap())))
    }

    async fn health_info(&self, _cancel: CancellationToken, deadline: Duration) -> Result<EventStream<Value>, SourceError> {
        *self.last_deadline.lock().unwrap() = Some(deadline);
        Ok(replay(std::mem::take(&mut *self.raw_records.lock().unwrap())))
    }

    async fn watch_bucket(&self, _cancel: CancellationToken, opts: &WatchOptions) -> Result<EventStream<Value>, SourceError> {
        *self.last_watch.lock().unwrap() = Some(opts.clone());
        Ok(replay(std::mem::take(&mut *self.raw_records.lock().unwrap())))
    }

    async fn heal_start(&self, request: &HealRequest) -> Result<HealStartSuccess, SourceError> {
        self.heal_start_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_heal_request.lock().unwrap() = Some(request.clone());
        self.heal_start_result.lock().unwrap().take().unwrap_or_else(|| {
            Ok(HealStartSuccess {
                client_token: "token-1".to_string(),
                ..Default::default()
            })
        })
    }

    async fn heal_status(&self, _bucket: &str, _prefix: &str, _client_token: &str) -> Result<HealTaskStatus, SourceError> {
        self.heal_status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.heal_batches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(HealTaskStatus {
                summary: "running".to_string(),
                ..Default::default()
            })
        })
    }
}

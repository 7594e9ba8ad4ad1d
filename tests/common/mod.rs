//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use ops_relay::cluster::{ClusterAdmin, LogInfo, LogOptions, WatchOptions};
use ops_relay::heal::types::{HealRequest, HealStartSuccess, HealTaskStatus};
use ops_relay::stream::{EventStream, SourceError};
use ops_relay::trace::{TraceInfo, TraceOptions};
use ops_relay::{HttpServer, RelayConfig};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// In-process stand-in for a storage cluster.
#[derive(Default)]
pub struct FakeCluster {
    pub trace_records: Mutex<Vec<TraceInfo>>,
    /// Delivered after the records, as an embedded error.
    pub trace_error: Mutex<Option<SourceError>>,
    /// Keep the trace stream open until the session is cancelled.
    pub hold_open: AtomicBool,
    pub source_cancelled: Arc<AtomicBool>,

    pub heal_batches: Mutex<VecDeque<HealTaskStatus>>,
    pub heal_start_calls: AtomicUsize,
    pub heal_status_calls: AtomicUsize,
}

impl FakeCluster {
    pub fn with_traces(records: Vec<TraceInfo>) -> Self {
        let cluster = Self::default();
        *cluster.trace_records.lock().unwrap() = records;
        cluster
    }

    pub fn with_heal_batches(batches: Vec<HealTaskStatus>) -> Self {
        let cluster = Self::default();
        *cluster.heal_batches.lock().unwrap() = batches.into();
        cluster
    }
}

fn closed<T>() -> EventStream<T> {
    let (_tx, rx) = mpsc::channel(1);
    rx
}

#[async_trait]
impl ClusterAdmin for FakeCluster {
    async fn trace(&self, cancel: CancellationToken, _opts: &TraceOptions) -> Result<EventStream<TraceInfo>, SourceError> {
        let records = std::mem::take(&mut *self.trace_records.lock().unwrap());
        let error = self.trace_error.lock().unwrap().take();
        let hold_open = self.hold_open.load(Ordering::SeqCst);
        let cancelled = Arc::clone(&self.source_cancelled);

        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for record in records {
                if tx.send(Ok(record)).await.is_err() {
                    return;
                }
            }
            if let Some(error) = error {
                let _ = tx.send(Err(error)).await;
            }
            if hold_open {
                cancel.cancelled().await;
                cancelled.store(true, Ordering::SeqCst);
            }
        });
        Ok(rx)
    }

    async fn console_log(&self, _cancel: CancellationToken, _opts: &LogOptions) -> Result<EventStream<LogInfo>, SourceError> {
        Ok(closed())
    }

    async fn health_info(&self, _cancel: CancellationToken, _deadline: Duration) -> Result<EventStream<Value>, SourceError> {
        Ok(closed())
    }

    async fn watch_bucket(&self, _cancel: CancellationToken, _opts: &WatchOptions) -> Result<EventStream<Value>, SourceError> {
        Ok(closed())
    }

    async fn heal_start(&self, _request: &HealRequest) -> Result<HealStartSuccess, SourceError> {
        self.heal_start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(HealStartSuccess {
            client_token: "token-1".to_string(),
            ..Default::default()
        })
    }

    async fn heal_status(&self, _bucket: &str, _prefix: &str, _client_token: &str) -> Result<HealTaskStatus, SourceError> {
        self.heal_status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.heal_batches.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| HealTaskStatus {
            summary: "running".to_string(),
            ..Default::default()
        }))
    }
}

/// Start the relay on an ephemeral port. Cancel the returned token to stop it.
pub async fn start_relay(cluster: Arc<FakeCluster>) -> (SocketAddr, CancellationToken) {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.stream.heal_poll_interval_ms = 20;

    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let server = HttpServer::new(config, cluster);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub async fn connect(addr: SocketAddr, path_and_query: &str) -> Client {
    let (socket, _) = connect_async(format!("ws://{addr}/ws/{path_and_query}"))
        .await
        .expect("upgrade refused");
    socket
}

/// Collect text frames until the server closes the stream.
pub async fn read_until_close(client: &mut Client) -> (Vec<Value>, Option<CloseFrame>) {
    let mut messages = Vec::new();
    let read = async {
        while let Some(message) = client.next().await {
            match message.expect("read failed") {
                Message::Text(text) => messages.push(serde_json::from_str(text.as_str()).unwrap()),
                Message::Close(frame) => return frame,
                _ => {}
            }
        }
        None
    };
    let frame = tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("stream did not close in time");
    (messages, frame)
}

/// Poll `flag` until it is set or `limit` passes.
pub async fn wait_for(flag: &AtomicBool, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    flag.load(Ordering::SeqCst)
}

//! HTTP client for the cluster admin API.
//!
//! # Responsibilities
//! - Build admin URLs and attach the bearer identity
//! - Turn non-2xx answers into [`SourceError::Remote`]
//! - Spawn one reader task per streaming call, decoding newline-delimited JSON
//!
//! # Design Decisions
//! - The reader stops on session cancellation or when the session drops the receiver
//! - A transport error mid-stream is delivered as an embedded error, then the reader stops

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cluster::json_lines::JsonLines;
use crate::cluster::{ClusterAdmin, LogInfo, LogOptions, WatchOptions};
use crate::config::ClusterConfig;
use crate::heal::types::{HealRequest, HealStartSuccess, HealTaskStatus};
use crate::stream::{EventStream, SourceError};
use crate::trace::{TraceInfo, TraceKinds, TraceOptions};

/// Interval, in seconds, at which the cluster pads idle notification streams.
const WATCH_PING_SECS: &str = "10";

pub struct RemoteCluster {
    client: Client,
    endpoint: Url,
    admin_prefix: String,
    access_token: Option<String>,
    stream_buffer: usize,
}

impl RemoteCluster {
    pub fn new(config: &ClusterConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: Client::new(),
            endpoint: Url::parse(&config.endpoint)?,
            admin_prefix: config.admin_prefix.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            stream_buffer: config.stream_buffer.max(1),
        })
    }

    fn admin_url(&self, path: &str) -> Url {
        self.cluster_url(&format!("{}{}", self.admin_prefix, path))
    }

    fn cluster_url(&self, path: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path(path);
        url
    }

    fn heal_url(&self, bucket: &str, prefix: &str) -> Url {
        let mut url = self.admin_url("/heal/");
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(bucket);
            if !prefix.is_empty() {
                segments.extend(prefix.split('/'));
            }
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SourceError> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(|e| SourceError::Stream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = if message.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                message.trim().to_string()
            };
            return Err(SourceError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn open_stream<T>(
        &self,
        operation: &'static str,
        cancel: CancellationToken,
        request: RequestBuilder,
    ) -> Result<EventStream<T>, SourceError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let response = self.send(request).await?;
        tracing::debug!(operation, "Cluster stream opened");
        Ok(spawn_reader(operation, cancel, response, self.stream_buffer))
    }
}

/// Read `response` line by line into a bounded channel.
fn spawn_reader<T>(operation: &'static str, cancel: CancellationToken, response: Response, buffer: usize) -> EventStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let (tx, rx) = mpsc::channel(buffer);
    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut decoder = JsonLines::new();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tx.closed() => break,
                chunk = body.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    for record in decoder.push::<T>(&bytes) {
                        if tx.send(record).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(operation, error = %e, "Cluster stream failed");
                    let _ = tx.send(Err(SourceError::Stream(e.to_string()))).await;
                    break;
                }
                None => {
                    if let Some(record) = decoder.finish::<T>() {
                        let _ = tx.send(record).await;
                    }
                    break;
                }
            }
        }
        tracing::debug!(operation, "Cluster stream reader stopped");
    });
    rx
}

/// Durations go over the wire as whole milliseconds, e.g. `1500ms`.
fn millis(d: Duration) -> String {
    format!("{}ms", d.as_millis())
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[async_trait]
impl ClusterAdmin for RemoteCluster {
    async fn trace(&self, cancel: CancellationToken, opts: &TraceOptions) -> Result<EventStream<TraceInfo>, SourceError> {
        let mut query = vec![
            ("s3", flag(opts.kinds.contains(TraceKinds::S3)).to_string()),
            ("internal", flag(opts.kinds.contains(TraceKinds::INTERNAL)).to_string()),
            ("storage", flag(opts.kinds.contains(TraceKinds::STORAGE)).to_string()),
            ("os", flag(opts.kinds.contains(TraceKinds::OS)).to_string()),
            ("err", flag(opts.only_errors).to_string()),
        ];
        if let Some(threshold) = opts.threshold {
            query.push(("threshold", millis(threshold)));
        }
        let request = self.client.get(self.admin_url("/trace")).query(&query);
        self.open_stream("trace", cancel, request).await
    }

    async fn console_log(&self, cancel: CancellationToken, opts: &LogOptions) -> Result<EventStream<LogInfo>, SourceError> {
        let mut query = vec![("logType", opts.kind.as_str().to_string())];
        if let Some(node) = &opts.node {
            query.push(("node", node.clone()));
        }
        if let Some(lines) = opts.line_count {
            query.push(("limit", lines.to_string()));
        }
        let request = self.client.get(self.admin_url("/log")).query(&query);
        self.open_stream("console", cancel, request).await
    }

    async fn health_info(&self, cancel: CancellationToken, deadline: Duration) -> Result<EventStream<Value>, SourceError> {
        let query = [("deadline", millis(deadline))];
        let request = self.client.get(self.admin_url("/healthinfo")).query(&query);
        self.open_stream("health-info", cancel, request).await
    }

    async fn watch_bucket(&self, cancel: CancellationToken, opts: &WatchOptions) -> Result<EventStream<Value>, SourceError> {
        let mut url = self.cluster_url("/");
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear().push(&opts.bucket);
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("ping", WATCH_PING_SECS)
                .append_pair("prefix", &opts.prefix)
                .append_pair("suffix", &opts.suffix);
            for event in &opts.events {
                pairs.append_pair("events", event.s3_event());
            }
        }
        let request = self.client.get(url);
        self.open_stream("watch", cancel, request).await
    }

    async fn heal_start(&self, request: &HealRequest) -> Result<HealStartSuccess, SourceError> {
        let mut query = Vec::new();
        if request.force_start {
            query.push(("forceStart", "true"));
        }
        if request.force_stop {
            query.push(("forceStop", "true"));
        }
        let call = self
            .client
            .post(self.heal_url(&request.bucket, &request.prefix))
            .query(&query)
            .json(&request.opts);
        let response = self.send(call).await?;
        response
            .json::<HealStartSuccess>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    async fn heal_status(&self, bucket: &str, prefix: &str, client_token: &str) -> Result<HealTaskStatus, SourceError> {
        let call = self
            .client
            .post(self.heal_url(bucket, prefix))
            .query(&[("clientToken", client_token)]);
        let response = self.send(call).await?;
        response
            .json::<HealTaskStatus>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

//! Record and option types exchanged with the cluster for log and watch streams.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Time layout shown to console clients, e.g. `15:04:05 UTC 05/01/2024`.
const LOG_TIME_FORMAT: &str = "%H:%M:%S %Z %m/%d/%Y";

/// Which log sources to tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogKind {
    #[default]
    All,
    Minio,
    Application,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::All => "all",
            LogKind::Minio => "minio",
            LogKind::Application => "application",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(LogKind::All),
            "minio" => Some(LogKind::Minio),
            "application" => Some(LogKind::Application),
            _ => None,
        }
    }
}

/// Options for a log tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Restrict to one node; `None` tails every node.
    pub node: Option<String>,
    /// Number of past lines to replay; `None` leaves it to the cluster.
    pub line_count: Option<u32>,
    pub kind: LogKind,
}

/// One log entry from the cluster. Fields other than the ones reshaped for
/// the console are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogInfo {
    #[serde(default)]
    pub time: String,
    #[serde(rename = "ConsoleMsg", default)]
    pub console_msg: String,
    #[serde(rename = "node", default)]
    pub node_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogInfo {
    /// Reshape for the console: readable time, no leading newline in the message.
    pub fn for_console(mut self) -> Self {
        self.time = console_time(&self.time);
        if let Some(stripped) = self.console_msg.strip_prefix('\n') {
            self.console_msg = stripped.to_string();
        }
        self
    }
}

/// Reformat an RFC 3339 timestamp; unparseable input is returned as is.
fn console_time(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => t.with_timezone(&chrono::Utc).format(LOG_TIME_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Bucket event groups a client can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    Put,
    Get,
    Delete,
}

impl WatchEvent {
    pub const DEFAULT: [WatchEvent; 3] = [WatchEvent::Put, WatchEvent::Get, WatchEvent::Delete];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "put" => Some(WatchEvent::Put),
            "get" => Some(WatchEvent::Get),
            "delete" => Some(WatchEvent::Delete),
            _ => None,
        }
    }

    /// Notification event name understood by the cluster.
    pub fn s3_event(&self) -> &'static str {
        match self {
            WatchEvent::Put => "s3:ObjectCreated:*",
            WatchEvent::Get => "s3:ObjectAccessed:*",
            WatchEvent::Delete => "s3:ObjectRemoved:*",
        }
    }
}

/// Options for a bucket notification watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub bucket: String,
    pub events: Vec<WatchEvent>,
    pub prefix: String,
    pub suffix: String,
}

//! Trace records, options and the shortened client message.

use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Bit set of call kinds to trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TraceKinds(u64);

impl TraceKinds {
    pub const OS: TraceKinds = TraceKinds(1 << 0);
    pub const STORAGE: TraceKinds = TraceKinds(1 << 1);
    pub const S3: TraceKinds = TraceKinds(1 << 2);
    pub const INTERNAL: TraceKinds = TraceKinds(1 << 3);

    pub const ALL: TraceKinds = TraceKinds(Self::OS.0 | Self::STORAGE.0 | Self::S3.0 | Self::INTERNAL.0);

    pub fn contains(&self, x: TraceKinds) -> bool {
        (self.0 & x.0) == x.0
    }

    pub fn merge(&mut self, other: TraceKinds) {
        self.0 |= other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Options forwarded to the trace source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    pub kinds: TraceKinds,
    /// Only report calls slower than this.
    pub threshold: Option<Duration>,
    pub only_errors: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            kinds: TraceKinds::S3,
            threshold: None,
            only_errors: false,
        }
    }
}

/// Client-side filters. At most one is applied; see [`crate::trace::filter::matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceFilters {
    pub path: Option<String>,
    pub status_code: Option<u16>,
    pub method: Option<String>,
    pub func_name: Option<String>,
}

impl TraceFilters {
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.status_code.is_none() && self.method.is_none() && self.func_name.is_none()
    }
}

/// Durations are nanosecond integers on the wire.
mod nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_nanos().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let n = i64::deserialize(d)?;
        Ok(Duration::from_nanos(n.max(0) as u64))
    }
}

/// One traced call as produced by the cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceInfo {
    #[serde(rename = "type")]
    pub trace_type: u64,
    #[serde(rename = "nodename")]
    pub node_name: String,
    #[serde(rename = "funcname")]
    pub func_name: String,
    pub time: DateTime<Utc>,
    pub path: String,
    #[serde(rename = "dur", with = "nanos")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<TraceHttpStats>,
}

impl TraceInfo {
    pub fn status_code(&self) -> Option<u16> {
        self.http.as_ref().and_then(|h| h.resp_info.status_code)
    }

    pub fn method(&self) -> Option<&str> {
        self.http.as_ref().map(|h| h.req_info.method.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceHttpStats {
    #[serde(rename = "request")]
    pub req_info: TraceRequestInfo,
    #[serde(rename = "response")]
    pub resp_info: TraceResponseInfo,
    #[serde(rename = "stats")]
    pub call_stats: TraceCallStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceRequestInfo {
    pub time: DateTime<Utc>,
    pub proto: String,
    pub method: String,
    pub path: String,
    #[serde(rename = "rawquery")]
    pub raw_query: String,
    pub client: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceResponseInfo {
    pub time: DateTime<Utc>,
    #[serde(rename = "statuscode", skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceCallStats {
    #[serde(rename = "inputbytes")]
    pub input_bytes: i64,
    #[serde(rename = "outputbytes")]
    pub output_bytes: i64,
    #[serde(with = "nanos")]
    pub latency: Duration,
    #[serde(rename = "timetofirstbyte", with = "nanos")]
    pub time_to_first_byte: Duration,
}

/// Call statistics in the shortened message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortCallStats {
    pub rx: i64,
    pub tx: i64,
    pub duration: String,
    pub time_to_first_byte: String,
}

/// Shortened trace record sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortTraceMsg {
    pub host: String,
    pub time: String,
    pub client: String,
    pub call_stats: ShortCallStats,
    pub api: String,
    pub path: String,
    pub query: String,
    pub status_code: u16,
    pub status_msg: String,
}

impl From<&TraceInfo> for ShortTraceMsg {
    fn from(info: &TraceInfo) -> Self {
        let http = info.http.clone().unwrap_or_default();
        let status_code = http.resp_info.status_code.unwrap_or_default();
        let status_msg = StatusCode::from_u16(status_code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            host: info.node_name.clone(),
            time: info.time.to_rfc3339_opts(SecondsFormat::Secs, true),
            client: http.req_info.client,
            call_stats: ShortCallStats {
                rx: http.call_stats.input_bytes,
                tx: http.call_stats.output_bytes,
                duration: humantime::format_duration(info.duration).to_string(),
                time_to_first_byte: humantime::format_duration(http.call_stats.time_to_first_byte).to_string(),
            },
            api: info.func_name.clone(),
            path: info.path.clone(),
            query: http.req_info.raw_query,
            status_code,
            status_msg,
        }
    }
}

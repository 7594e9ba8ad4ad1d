//! Error types for streaming sessions.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by an operation source while a session is running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The cluster answered with a non-success status.
    #[error("cluster returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// The connection to the cluster failed mid-stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// A record could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A one-shot admin call did not complete in time.
    #[error("{operation} timed out after {}", humantime::format_duration(*.after))]
    Timeout { operation: &'static str, after: Duration },

    /// The cluster stopped the heal sequence.
    #[error("heal stopped: {0}")]
    HealStopped(String),

    /// The cluster returned data that cannot be interpreted.
    #[error("malformed result: {0}")]
    Malformed(String),
}

impl SourceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SourceError::Timeout { .. })
    }
}

/// Failure writing to (or closing) the client connection.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Reason a relay stopped with an error.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RelayError {
    /// Timeout-class failures are reported to the client as policy violations.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RelayError::Source(e) if e.is_timeout())
    }
}

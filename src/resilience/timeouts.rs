//! Timeout enforcement for one-shot admin calls.
//!
//! # Responsibilities
//! - Wrap cluster calls that must answer promptly (heal start, heal status)
//! - Report expiry as a distinct, timeout-class error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Streaming calls are not wrapped: they end via cancellation instead

use std::future::Future;
use std::time::Duration;

use crate::stream::SourceError;

/// Default limit for one-shot admin calls.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Run `fut`, failing with [`SourceError::Timeout`] if it takes longer than `limit`.
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout = ?limit, "Admin call timed out");
            Err(SourceError::Timeout { operation, after: limit })
        }
    }
}

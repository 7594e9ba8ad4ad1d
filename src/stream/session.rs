//! Session identity and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Track live sessions for the status endpoint and shutdown drain
//! - Hand each session a cancellation token derived from the server's root token

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique identifier for a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0.simple())
    }
}

/// Tracks live sessions and owns the root cancellation token.
///
/// Cancelling the root token (server shutdown) cancels every session.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    active_count: Arc<AtomicU64>,
    idle: Arc<Notify>,
    root: CancellationToken,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            active_count: Arc::new(AtomicU64::new(0)),
            idle: Arc::new(Notify::new()),
            root: CancellationToken::new(),
        }
    }

    /// Register a new session. The returned guard decrements the count on drop.
    pub fn track(&self) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            idle: Arc::clone(&self.idle),
            id: SessionId::new(),
            cancel: self.root.child_token(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Cancel every live session.
    pub fn cancel_all(&self) {
        self.root.cancel();
    }

    /// Wait until all sessions have ended, up to `limit`. Returns false on timeout.
    pub async fn drain(&self, limit: Duration) -> bool {
        let wait = async {
            loop {
                // Enabled before the count check so a concurrent drop is not missed.
                let notified = self.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.active_count.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(limit, wait).await.is_ok()
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard held for the lifetime of one session.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    idle: Arc<Notify>,
    id: SessionId,
    cancel: CancellationToken,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The session's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.active_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

//! WebSocket stream sessions.
//!
//! # Responsibilities
//! - Validate the operation request before upgrading
//! - Run one operation per upgraded connection
//! - Map the session result to a close frame
//!
//! # Data Flow
//! ```text
//! GET /ws/{operation}?query
//!     → OperationRequest::parse (400 on error, no upgrade)
//!     → upgrade
//!     → reader half → watchdog (client close → cancel)
//!     → writer half → WebSocketSink ← relay (operation source)
//!     → close frame (1000 ok / 1008 timeout / 1011 error)
//! ```
//!
//! # Design Decisions
//! - The session token is a child of the server's root token
//! - The close reason carries the error text, truncated to fit a control frame

use std::time::Instant;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{close_code, CloseFrame, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde_json::json;
use tracing::Instrument;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::operations::{OperationKind, OperationRequest, RequestError};
use crate::stream::{watchdog, RelayError, SessionGuard, WatchEnd, WebSocketSink};

/// Longest close reason that fits a control frame after the 2-byte code.
pub const MAX_CLOSE_REASON: usize = 123;

/// Upgrade handler for `/ws/{*operation}`.
pub async fn stream_handler(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    RawQuery(query): RawQuery,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let request = match OperationRequest::parse(&operation, query.as_deref()) {
        Ok(request) => request,
        Err(e) => return reject(&operation, e),
    };
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let guard = state.sessions.track();
    upgrade.on_upgrade(move |socket| {
        let span = tracing::info_span!("session", session_id = %guard.id(), operation = request.kind().as_str());
        serve_session(socket, request, state, guard).instrument(span)
    })
}

fn reject(path: &str, error: RequestError) -> Response {
    let label = OperationKind::from_path(path).map_or("unknown", |kind| kind.as_str());
    metrics::record_request_rejected(label);
    tracing::warn!(operation = label, error = %error, "Rejected stream request");

    let status = match &error {
        RequestError::UnknownOperation(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

/// Drive one session from upgrade to close.
async fn serve_session(socket: WebSocket, request: OperationRequest, state: AppState, guard: SessionGuard) {
    let operation = request.kind().as_str();
    let started = Instant::now();
    metrics::record_session_started(operation);
    tracing::info!("Session started");

    let cancel = guard.token().clone();
    let (sender, receiver) = socket.split();
    let watchdog = watchdog::spawn(receiver, cancel.clone());
    let mut sink = WebSocketSink::new(sender, operation);

    let result = request
        .run(state.cluster.as_ref(), &cancel, &mut sink, &state.settings)
        .await;

    // Release the watchdog if the session ended on its own.
    cancel.cancel();
    let end = watchdog
        .await
        .unwrap_or_else(|e| WatchEnd::Abnormal(format!("watchdog task failed: {e}")));

    if let Err(e) = sink.close(close_frame_for(&result)).await {
        tracing::debug!(error = %e, "Close frame not delivered");
    }

    let outcome = outcome_label(&result);
    metrics::record_session_finished(operation, outcome, started);
    match &result {
        Ok(()) => tracing::info!(
            client = ?end,
            duration_ms = started.elapsed().as_millis() as u64,
            "Session finished"
        ),
        Err(e) => tracing::warn!(
            client = ?end,
            outcome,
            error = %e,
            duration_ms = started.elapsed().as_millis() as u64,
            "Session failed"
        ),
    }
    drop(guard);
}

fn outcome_label(result: &Result<(), RelayError>) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(e) if e.is_timeout() => "timeout",
        Err(_) => "error",
    }
}

/// Close frame for a session result.
pub fn close_frame_for(result: &Result<(), RelayError>) -> CloseFrame {
    match result {
        Ok(()) => CloseFrame {
            code: close_code::NORMAL,
            reason: "".into(),
        },
        Err(e) => CloseFrame {
            code: if e.is_timeout() {
                close_code::POLICY
            } else {
                close_code::ERROR
            },
            reason: truncate_reason(&e.to_string()).into(),
        },
    }
}

/// Cut `reason` to at most [`MAX_CLOSE_REASON`] bytes on a char boundary.
pub fn truncate_reason(reason: &str) -> String {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason.to_string();
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}

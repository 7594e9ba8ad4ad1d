//! Client watchdog.
//!
//! The protocol is push-only once a session starts, so the reader half of the
//! connection exists only to notice the client going away. Inbound data frames
//! are discarded. Any terminal read cancels the session token.

use axum::extract::ws::{close_code, CloseFrame, Message};
use futures_util::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How a watchdog finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEnd {
    /// The client closed with "normal closure" or "going away".
    ClientClosed,
    /// The connection ended any other way.
    Abnormal(String),
    /// The session ended first and released the watchdog.
    Released,
}

/// Spawn a watchdog over the reader half of a connection.
pub fn spawn<R, E>(reader: R, cancel: CancellationToken) -> JoinHandle<WatchEnd>
where
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(watch(reader, cancel))
}

/// Read until the client goes away or `cancel` fires, then cancel the session.
pub async fn watch<R, E>(mut reader: R, cancel: CancellationToken) -> WatchEnd
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    let end = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return WatchEnd::Released,
            frame = reader.next() => frame,
        };

        match frame {
            Some(Ok(Message::Close(frame))) => break classify_close(frame.as_ref()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => break WatchEnd::Abnormal(format!("read error: {e}")),
            None => break WatchEnd::Abnormal("connection dropped without close frame".to_string()),
        }
    };

    match &end {
        WatchEnd::Abnormal(reason) => tracing::warn!(reason = %reason, "Client connection ended unexpectedly"),
        _ => tracing::debug!("Client closed connection"),
    }
    cancel.cancel();
    end
}

/// Classify a close frame sent by the client.
pub fn classify_close(frame: Option<&CloseFrame>) -> WatchEnd {
    match frame {
        Some(f) if f.code == close_code::NORMAL || f.code == close_code::AWAY => WatchEnd::ClientClosed,
        Some(f) => WatchEnd::Abnormal(format!("unexpected close code {}", f.code)),
        None => WatchEnd::Abnormal("close frame without status".to_string()),
    }
}

//! Outbound message sinks.
//!
//! # Responsibilities
//! - Abstract the writer half of a client connection
//! - Deliver one JSON document per text frame
//! - Send a best-effort close frame when a session ends
//!
//! # Design Decisions
//! - Only the relay task writes; the sink is owned, not shared
//! - No buffering or retry: a failed write ends the session

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

use crate::observability::metrics;
use crate::stream::error::TransportError;

/// Destination for serialized session messages.
#[async_trait]
pub trait Sink: Send {
    /// Write one text message.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
}

/// Sink over the writer half of an upgraded WebSocket.
pub struct WebSocketSink {
    sender: SplitSink<WebSocket, Message>,
    operation: &'static str,
}

impl WebSocketSink {
    pub fn new(sender: SplitSink<WebSocket, Message>, operation: &'static str) -> Self {
        Self { sender, operation }
    }

    /// Send a close frame and flush. Errors are returned but callers usually ignore them.
    pub async fn close(&mut self, frame: CloseFrame) -> Result<(), TransportError> {
        self.sender
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        self.sender
            .close()
            .await
            .map_err(|e| TransportError(e.to_string()))
    }
}

#[async_trait]
impl Sink for WebSocketSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        metrics::record_message_relayed(self.operation);
        Ok(())
    }
}

/// In-memory sink that collects messages.
#[async_trait]
impl Sink for Vec<String> {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.push(text);
        Ok(())
    }
}

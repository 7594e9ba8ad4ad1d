//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → websocket.rs (validate, upgrade, run one operation, close)
//!     → /health (liveness and active session count)
//! ```

pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};

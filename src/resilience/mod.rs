//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! one-shot admin call (heal start / heal status)
//!     → timeouts.rs (enforce call deadline)
//!     → on expiry: SourceError::Timeout → session closes with policy violation
//! ```
//!
//! # Design Decisions
//! - Every one-shot call has a deadline
//! - Nothing in a session is retried; reconnecting is the client's job

pub mod timeouts;

pub use timeouts::{with_timeout, DEFAULT_CALL_TIMEOUT};

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → metrics → cluster client → listener → serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel the shutdown token
//!
//! Shutdown (http/server.rs):
//!     token cancelled → stop accepting → cancel sessions → drain → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, cancel, drain
//! - Shutdown has a deadline: sessions still open after the drain limit are abandoned

pub mod signals;
pub mod startup;

pub use startup::StartupError;

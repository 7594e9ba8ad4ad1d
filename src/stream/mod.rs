//! Streaming session subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket upgrade
//!     → session.rs (id, cancellation token, tracking)
//!     → watchdog.rs (reader half: client close → cancel)
//!     → relay.rs (source → transform → sink, or timed poller → sink)
//!     → sink.rs (writer half: one JSON text frame per message)
//! ```
//!
//! # Design Decisions
//! - Exactly two tasks per session; they share only the cancellation token
//! - The relay is the single writer, so outbound messages are totally ordered
//! - Sources are injected and must stop themselves when the token fires

pub mod error;
pub mod relay;
pub mod session;
pub mod sink;
pub mod watchdog;

pub use error::{RelayError, SourceError, TransportError};
pub use relay::{EventStream, Poller, Tick};
pub use session::{SessionGuard, SessionId, SessionTracker};
pub use sink::{Sink, WebSocketSink};
pub use watchdog::WatchEnd;

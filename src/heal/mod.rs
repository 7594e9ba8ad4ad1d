//! Heal subsystem.
//!
//! # Data Flow
//! ```text
//! HealRequest
//!     → aggregator.rs (start, then poll the sequence status)
//!     → color.rs (before/after color per item)
//!     → HealStatus snapshot (cumulative, emitted after every poll)
//! ```

pub mod aggregator;
pub mod color;
pub mod types;

pub use aggregator::{HealSession, HealState, StartOutcome};
pub use color::{classify, classify_object, classify_replicated, ClassifyError, Color};
pub use types::{HealOpts, HealRequest, HealScanMode, HealStatus, HealTaskStatus};

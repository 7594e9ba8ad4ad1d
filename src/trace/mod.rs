//! Call tracing.
//!
//! # Data Flow
//! ```text
//! cluster trace stream (TraceInfo records)
//!     → filter.rs (first set filter decides)
//!     → types.rs (reshape into ShortTraceMsg)
//!     → client
//! ```

pub mod filter;
pub mod types;

pub use filter::matches;
pub use types::{ShortTraceMsg, TraceFilters, TraceInfo, TraceKinds, TraceOptions};

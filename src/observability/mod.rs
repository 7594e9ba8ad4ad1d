//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! server, sessions, cluster client produce:
//!     → logging.rs (structured log events, one span per session)
//!     → metrics.rs (session counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields everywhere, JSON output for machine parsing
//! - Session ID flows through every event of a session via its span
//! - Metrics are cheap (atomic increments); recording without an installed
//!   exporter is a no-op

pub mod logging;
pub mod metrics;

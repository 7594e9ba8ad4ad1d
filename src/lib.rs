//! Operations relay library.
//!
//! Relays long-running administrative operations of a storage cluster (call
//! trace, log tail, heal, health diagnostics, bucket notifications) to
//! WebSocket clients, one operation per connection.

// Domain
pub mod cluster;
pub mod heal;
pub mod operations;
pub mod stream;
pub mod trace;

// Server
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use cluster::ClusterAdmin;
pub use config::RelayConfig;
pub use http::HttpServer;

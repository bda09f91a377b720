//! # pmu-relay
//!
//! Server side of the PMU synchronization dashboard: consumes the grid and
//! microgrid sample channels and pushes combined envelopes to every
//! connected WebSocket client.

pub mod config;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod server;

pub use config::Config;
pub use handlers::{build_router, AppState};

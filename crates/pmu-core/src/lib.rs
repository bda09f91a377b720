//! # pmu-core
//!
//! Relay engine for the PMU synchronization dashboard.
//!
//! This crate provides the building blocks between the inbound channels and
//! the live subscriber sessions:
//!
//! - **StateStore** - Latest sample per source, swapped atomically
//! - **Analyzer** - Phase angle and magnitude differences between the sources
//! - **Fanout** - Live session set and isolated per-session delivery
//! - **Relay** - Store and fan-out kept in one consistent order
//! - **IngestAdapter** - Drives one inbound channel into the relay
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────────┐
//! │   Channel   │────▶│   Ingest    │────▶│ StateStore  │────▶│  Fanout  │───▶ sessions
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │  Analyzer   │
//!                                         └─────────────┘
//! ```

pub mod analyzer;
pub mod fanout;
pub mod ingest;
pub mod metrics;
pub mod relay;
pub mod session;
pub mod store;

pub use analyzer::{analyze, normalize_angle, PhaseDifference, SynchronizationSnapshot};
pub use fanout::{BroadcastReport, Fanout, FanoutStats};
pub use ingest::{IngestAdapter, IngestStats};
pub use relay::Relay;
pub use session::{
    queued_session, DeliveryError, OutboundMessage, QueuedSession, SessionId, SessionReceiver,
    SessionSink,
};
pub use store::StateStore;

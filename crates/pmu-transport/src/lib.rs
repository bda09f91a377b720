//! # pmu-transport
//!
//! Inbound channel abstraction for the PMU relay.
//!
//! Each measurement source is fed by one [`SampleChannel`], which yields raw
//! records strictly in arrival order:
//!
//! - **NATS** - A subscription on a broker subject (feature `nats`)
//! - **Memory** - An in-process queue, for tests and embedding
//! - **Simulated** - A synthetic generator producing realistic readings
//!
//! ```rust,ignore
//! use pmu_transport::SampleChannel;
//!
//! async fn drain(mut channel: impl SampleChannel) {
//!     while let Ok(Some(record)) = channel.recv().await {
//!         // Decode record.payload
//!     }
//! }
//! ```

pub mod memory;
pub mod simulator;
pub mod traits;

#[cfg(feature = "nats")]
pub mod nats;

pub use memory::{memory_channel, MemoryChannel, MemorySender};
pub use simulator::{SimulatedChannel, SimulatorConfig};
pub use traits::{ChannelError, RawRecord, SampleChannel};

#[cfg(feature = "nats")]
pub use nats::{NatsChannel, NatsConnector};

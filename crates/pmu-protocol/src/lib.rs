//! # pmu-protocol
//!
//! Wire formats for the PMU synchronization relay.
//!
//! This crate defines the records the relay consumes and the frames it pushes:
//!
//! - [`PmuSample`] - One measurement snapshot from a phasor measurement unit
//! - [`Source`] / [`SourcePair`] - The grid and microgrid sources and their latest samples
//! - [`Envelope`] / [`Frame`] - The combined state pushed to subscribers
//! - [`StatusReport`] - Body of the status endpoint
//!
//! ## Example
//!
//! ```rust
//! use pmu_protocol::{codec, Envelope, PmuSample, Source, SourcePair};
//! use std::sync::Arc;
//!
//! // Decode an inbound record
//! let raw = codec::encode_sample(&PmuSample::nominal(1, 1_700_000_000.0)).unwrap();
//! let sample = Arc::new(codec::decode_sample(&raw).unwrap());
//!
//! // Wrap it for subscribers
//! let mut pair = SourcePair::default();
//! pair.set(Source::Grid, Arc::clone(&sample));
//! let text = codec::encode_envelope(&Envelope::update(Source::Grid, sample, &pair)).unwrap();
//! assert!(text.contains(r#""topic":"gridPMU""#));
//! ```

pub mod codec;
pub mod frames;
pub mod sample;
pub mod status;

pub use codec::{decode_sample, DecodeError, ProtocolError};
pub use frames::{Envelope, Frame, Source, SourcePair};
pub use sample::{Phase, PhaseReading, PmuSample};
pub use status::{DataAvailability, StatusReport};

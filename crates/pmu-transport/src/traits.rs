//! Channel abstraction traits.
//!
//! A [`SampleChannel`] is the relay's view of one external inbound stream.
//! Implementations must hand records out in the order they arrived and must
//! never batch or reorder them.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::SystemTime;
use thiserror::Error;

/// One raw inbound record, not yet decoded.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Subject or topic the record arrived on.
    pub subject: String,
    /// Undecoded record body.
    pub payload: Bytes,
    /// When the relay received the record.
    pub received_at: SystemTime,
}

impl RawRecord {
    /// Create a record received now.
    #[must_use]
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
            received_at: SystemTime::now(),
        }
    }

    /// Size of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// `true` when the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Could not reach the upstream endpoint.
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// Connected, but could not subscribe to the subject.
    #[error("Failed to subscribe to {subject}: {reason}")]
    Subscribe { subject: String, reason: String },

    /// A receive failed after the channel was established.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

impl ChannelError {
    /// `true` for failures to establish the channel in the first place.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        matches!(
            self,
            ChannelError::Connect { .. } | ChannelError::Subscribe { .. }
        )
    }
}

/// An ordered stream of raw records from one source.
#[async_trait]
pub trait SampleChannel: Send {
    /// Human-readable channel name for logs (e.g. the subject).
    fn name(&self) -> &str;

    /// Receive the next record.
    ///
    /// Returns `Ok(None)` once the channel has ended cleanly.
    async fn recv(&mut self) -> Result<Option<RawRecord>, ChannelError>;
}

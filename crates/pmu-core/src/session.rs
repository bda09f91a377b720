//! Subscriber session plumbing.
//!
//! The fan-out only ever talks to a [`SessionSink`]. Delivery must not block:
//! a sink either accepts the message or reports why it cannot, and a failing
//! sink is evicted without affecting the others.
//!
//! [`QueuedSession`] is the sink used by the WebSocket handler. Each session
//! owns a small ring of pending envelopes; when a slow reader lets it fill
//! up, the oldest pending envelopes are overwritten.

use pmu_protocol::{codec, Envelope, ProtocolError};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::metrics;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Why a session could not take a message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The session's reader is gone.
    #[error("Session closed")]
    Closed,

    /// The session did not accept the message in time.
    #[error("Delivery timed out")]
    Timeout,

    /// Any other transport failure.
    #[error("Delivery failed: {0}")]
    Failed(String),
}

impl DeliveryError {
    /// Short label used for the eviction metric.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Timeout => "timeout",
            Self::Failed(_) => "failed",
        }
    }
}

/// An envelope together with its encoded text.
///
/// Encoding happens once per envelope; every session shares the same text.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub envelope: Envelope,
    pub text: String,
}

impl OutboundMessage {
    /// Encode an envelope for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be serialized.
    pub fn encode(envelope: Envelope) -> Result<Self, ProtocolError> {
        let text = codec::encode_envelope(&envelope)?;
        Ok(Self { envelope, text })
    }
}

/// The fan-out's view of a live session.
pub trait SessionSink: Send + Sync {
    /// Session identifier.
    fn id(&self) -> SessionId;

    /// Hand one message to the session without blocking.
    ///
    /// # Errors
    ///
    /// Returns why the session cannot take the message; the fan-out then
    /// evicts it.
    fn deliver(&self, message: &Arc<OutboundMessage>) -> Result<(), DeliveryError>;
}

/// A session backed by a bounded drop-oldest queue.
#[derive(Debug)]
pub struct QueuedSession {
    id: SessionId,
    sender: broadcast::Sender<Arc<OutboundMessage>>,
    capacity: usize,
}

impl QueuedSession {
    /// Queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl SessionSink for QueuedSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn deliver(&self, message: &Arc<OutboundMessage>) -> Result<(), DeliveryError> {
        self.sender
            .send(Arc::clone(message))
            .map(|_| ())
            .map_err(|_| DeliveryError::Closed)
    }
}

/// Reading half of a [`QueuedSession`].
#[derive(Debug)]
pub struct SessionReceiver {
    id: SessionId,
    receiver: broadcast::Receiver<Arc<OutboundMessage>>,
    dropped: u64,
}

impl SessionReceiver {
    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Next pending message, skipping past anything lost to overflow.
    ///
    /// Returns `None` once the session has been removed from the fan-out.
    pub async fn recv(&mut self) -> Option<Arc<OutboundMessage>> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.dropped += skipped;
                    metrics::record_dropped(skipped);
                    debug!(session = %self.id, skipped = skipped, "Slow session, dropped oldest envelopes");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Envelopes lost to overflow so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Create a queued session with room for `capacity` pending envelopes.
#[must_use]
pub fn queued_session(capacity: usize) -> (Arc<QueuedSession>, SessionReceiver) {
    let capacity = capacity.max(1);
    let id = SessionId::generate();
    let (sender, receiver) = broadcast::channel(capacity);
    (
        Arc::new(QueuedSession {
            id,
            sender,
            capacity,
        }),
        SessionReceiver {
            id,
            receiver,
            dropped: 0,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmu_protocol::{PmuSample, Source, SourcePair};

    fn message(ts: f64) -> Arc<OutboundMessage> {
        let sample = Arc::new(PmuSample::nominal(1, ts));
        let mut pair = SourcePair::default();
        pair.set(Source::Grid, Arc::clone(&sample));
        Arc::new(OutboundMessage::encode(Envelope::update(Source::Grid, sample, &pair)).unwrap())
    }

    fn timestamp(message: &OutboundMessage) -> f64 {
        message.envelope.data.as_ref().unwrap().timestamp
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("session-"));
    }

    #[test]
    fn test_outbound_text_matches_envelope() {
        let message = message(7.0);
        let frame = codec::decode(&message.text).unwrap();
        let pmu_protocol::Frame::Data(envelope) = frame;
        assert_eq!(envelope, message.envelope);
    }

    #[tokio::test]
    async fn test_queued_session_delivers_in_order() {
        let (session, mut rx) = queued_session(8);
        for ts in [1.0, 2.0, 3.0] {
            session.deliver(&message(ts)).unwrap();
        }
        for ts in [1.0, 2.0, 3.0] {
            assert_eq!(timestamp(&rx.recv().await.unwrap()), ts);
        }
        assert_eq!(rx.id(), session.id());
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest() {
        let (session, mut rx) = queued_session(2);
        for ts in 1..=5 {
            session.deliver(&message(f64::from(ts))).unwrap();
        }
        assert_eq!(timestamp(&rx.recv().await.unwrap()), 4.0);
        assert_eq!(timestamp(&rx.recv().await.unwrap()), 5.0);
        assert_eq!(rx.dropped(), 3);
    }

    #[tokio::test]
    async fn test_deliver_to_dropped_receiver_is_closed() {
        let (session, rx) = queued_session(4);
        drop(rx);
        assert_eq!(session.deliver(&message(1.0)), Err(DeliveryError::Closed));
    }

    #[tokio::test]
    async fn test_receiver_ends_when_session_dropped() {
        let (session, mut rx) = queued_session(4);
        session.deliver(&message(1.0)).unwrap();
        drop(session);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (session, _rx) = queued_session(0);
        assert_eq!(session.capacity(), 1);
    }
}

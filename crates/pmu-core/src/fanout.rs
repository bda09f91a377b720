//! Broadcast fan-out to live sessions.
//!
//! Delivery walks a snapshot of the session set, so sessions may join or
//! leave while a broadcast is in flight. A session whose delivery fails is
//! removed after the walk; the others still receive the envelope.

use dashmap::DashMap;
use pmu_protocol::{Envelope, PmuSample, Source, SourcePair};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use crate::metrics;
use crate::session::{DeliveryError, OutboundMessage, SessionId, SessionSink};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions that accepted the envelope.
    pub delivered: usize,
    /// Sessions removed because delivery failed.
    pub evicted: usize,
}

/// Fan-out statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutStats {
    pub sessions: usize,
    pub delivered: u64,
    pub evicted: u64,
}

/// The live session set.
#[derive(Default)]
pub struct Fanout {
    sessions: DashMap<SessionId, Arc<dyn SessionSink>>,
    delivered: AtomicU64,
    evicted: AtomicU64,
}

impl Fanout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and bring it up to date.
    ///
    /// If `pair` holds any data the session first receives a state-sync
    /// envelope. Nothing is sent while the store is empty.
    ///
    /// # Errors
    ///
    /// Returns the delivery error if the sync envelope could not be handed
    /// over; the session is not kept in that case.
    pub fn on_subscribe(
        &self,
        session: Arc<dyn SessionSink>,
        pair: &SourcePair,
    ) -> Result<(), DeliveryError> {
        let id = session.id();
        if !pair.is_empty() {
            let message = OutboundMessage::encode(Envelope::sync(pair))
                .map_err(|e| DeliveryError::Failed(e.to_string()))?;
            if let Err(err) = session.deliver(&Arc::new(message)) {
                warn!(session = %id, error = %err, "Initial sync failed, dropping session");
                metrics::record_eviction(err.reason());
                return Err(err);
            }
            self.delivered.fetch_add(1, Ordering::Relaxed);
            metrics::record_delivered(1);
        }

        self.sessions.insert(id, session);
        metrics::record_session();
        metrics::set_active_sessions(self.sessions.len());
        debug!(session = %id, sessions = self.sessions.len(), "Session registered");
        Ok(())
    }

    /// Broadcast the envelope for a freshly stored sample.
    ///
    /// `pair` is the store state right after `sample` was written.
    pub fn on_sample(
        &self,
        topic: Source,
        sample: Arc<PmuSample>,
        pair: &SourcePair,
    ) -> BroadcastReport {
        match OutboundMessage::encode(Envelope::update(topic, sample, pair)) {
            Ok(message) => self.broadcast(Arc::new(message)),
            Err(err) => {
                error!(topic = %topic, error = %err, "Failed to encode envelope");
                BroadcastReport::default()
            }
        }
    }

    /// Hand one message to every live session.
    pub fn broadcast(&self, message: Arc<OutboundMessage>) -> BroadcastReport {
        let targets: Vec<Arc<dyn SessionSink>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for session in &targets {
            match session.deliver(&message) {
                Ok(()) => report.delivered += 1,
                Err(err) => failed.push((session.id(), err)),
            }
        }

        for (id, err) in failed {
            if self.sessions.remove(&id).is_some() {
                warn!(session = %id, error = %err, "Evicting session");
                metrics::record_eviction(err.reason());
                report.evicted += 1;
            }
        }

        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.evicted.fetch_add(report.evicted as u64, Ordering::Relaxed);
        metrics::record_delivered(report.delivered);
        if report.evicted > 0 {
            metrics::set_active_sessions(self.sessions.len());
        }
        trace!(
            delivered = report.delivered,
            evicted = report.evicted,
            "Broadcast complete"
        );
        report
    }

    /// Remove a session. Returns `false` if it was not registered.
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            metrics::set_active_sessions(self.sessions.len());
            debug!(session = %id, sessions = self.sessions.len(), "Session removed");
        }
        removed
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    #[must_use]
    pub fn stats(&self) -> FanoutStats {
        FanoutStats {
            sessions: self.sessions.len(),
            delivered: self.delivered.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

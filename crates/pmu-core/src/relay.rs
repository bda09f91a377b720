//! The relay: state store and fan-out behind one ordering point.
//!
//! Updates and subscriptions are serialized so that every session sees
//! envelopes in store order, and a joining session's sync envelope is never
//! older than the first update it receives.

use pmu_protocol::{PmuSample, Source, SourcePair};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::fanout::{BroadcastReport, Fanout};
use crate::session::{DeliveryError, SessionId, SessionSink};
use crate::store::StateStore;

#[derive(Default)]
pub struct Relay {
    store: StateStore,
    fanout: Fanout,
    order: Mutex<()>,
}

impl Relay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a sample and push the resulting envelope to every session.
    pub fn ingest(&self, source: Source, sample: PmuSample) -> BroadcastReport {
        let sample = Arc::new(sample);
        let _order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        let pair = self.store.set(source, Arc::clone(&sample));
        self.fanout.on_sample(source, sample, &pair)
    }

    /// Register a session, sending it the current state first.
    ///
    /// # Errors
    ///
    /// Returns the delivery error if the session refused its sync envelope.
    pub fn subscribe(&self, session: Arc<dyn SessionSink>) -> Result<(), DeliveryError> {
        let _order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        let pair = self.store.get();
        self.fanout.on_subscribe(session, &pair)
    }

    /// Remove a session.
    pub fn unsubscribe(&self, id: SessionId) -> bool {
        let removed = self.fanout.remove(id);
        if removed {
            debug!(session = %id, "Unsubscribed");
        }
        removed
    }

    /// Current pair, for the query endpoint.
    #[must_use]
    pub fn snapshot(&self) -> SourcePair {
        self.store.get()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.fanout.session_count()
    }

    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    #[must_use]
    pub fn fanout(&self) -> &Fanout {
        &self.fanout
    }
}

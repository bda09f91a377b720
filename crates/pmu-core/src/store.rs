//! Latest-value cache for the two sources.
//!
//! Each slot holds an `Arc<PmuSample>`; an update swaps the whole `Arc`, so a
//! reader either sees the previous sample or the new one, never a mix.

use pmu_protocol::{PmuSample, Source, SourcePair};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// The relay's state store.
///
/// There is one logical writer (the ingest path) and any number of readers.
/// The lock is only held to swap or clone `Arc`s.
#[derive(Debug, Default)]
pub struct StateStore {
    slots: RwLock<SourcePair>,
    updates: AtomicU64,
}

impl StateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current sample of `source`.
    ///
    /// Returns the pair as it stands right after the update.
    pub fn set(&self, source: Source, sample: Arc<PmuSample>) -> SourcePair {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.set(source, sample);
        self.updates.fetch_add(1, Ordering::Relaxed);
        trace!(source = %source, "Store updated");
        slots.clone()
    }

    /// Current pair.
    #[must_use]
    pub fn get(&self) -> SourcePair {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current sample of one source.
    #[must_use]
    pub fn latest(&self, source: Source) -> Option<Arc<PmuSample>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
    }

    /// Number of accepted updates since startup.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

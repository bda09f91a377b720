//! Ingest adapter.
//!
//! Drains one inbound channel into the relay, strictly in arrival order.
//! A record that fails to decode is logged and skipped; the loop only stops
//! when the channel ends or fails.

use pmu_protocol::{codec, DecodeError, Source};
use pmu_transport::{ChannelError, RawRecord, SampleChannel};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

use crate::fanout::BroadcastReport;
use crate::metrics;
use crate::relay::Relay;

/// Counters for one channel loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub rejected: u64,
}

#[derive(Clone)]
pub struct IngestAdapter {
    relay: Arc<Relay>,
}

impl IngestAdapter {
    #[must_use]
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }

    /// Decode one record and, if valid, store and broadcast it.
    ///
    /// # Errors
    ///
    /// Returns the decode error; the store is left untouched.
    pub fn process(
        &self,
        source: Source,
        record: &RawRecord,
    ) -> Result<BroadcastReport, DecodeError> {
        let sample = codec::decode_sample(&record.payload).map_err(|err| {
            metrics::record_decode_error(source);
            err
        })?;
        trace!(source = %source, pmu_id = sample.source_id, ts = sample.timestamp, "Sample accepted");

        let report = self.relay.ingest(source, sample);
        metrics::record_sample(source);
        if let Ok(elapsed) = record.received_at.elapsed() {
            metrics::record_ingest_latency(elapsed.as_secs_f64());
        }
        Ok(report)
    }

    /// Consume `channel` until it ends.
    ///
    /// # Errors
    ///
    /// Returns the channel error if receiving fails.
    pub async fn run<C: SampleChannel>(
        &self,
        source: Source,
        mut channel: C,
    ) -> Result<IngestStats, ChannelError> {
        info!(source = %source, channel = channel.name(), "Ingest started");
        let mut stats = IngestStats::default();
        loop {
            match channel.recv().await {
                Ok(Some(record)) => match self.process(source, &record) {
                    Ok(_) => stats.accepted += 1,
                    Err(err) => {
                        stats.rejected += 1;
                        warn!(
                            source = %source,
                            subject = %record.subject,
                            bytes = record.len(),
                            error = %err,
                            "Dropping undecodable record"
                        );
                    }
                },
                Ok(None) => {
                    info!(
                        source = %source,
                        accepted = stats.accepted,
                        rejected = stats.rejected,
                        "Ingest channel ended"
                    );
                    return Ok(stats);
                }
                Err(err) => {
                    error!(source = %source, error = %err, "Ingest channel failed");
                    return Err(err);
                }
            }
        }
    }
}

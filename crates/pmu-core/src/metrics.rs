//! Relay instrumentation.
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests do not need to set anything up.

use metrics::{counter, gauge, histogram};
use pmu_protocol::Source;

/// Metric names.
pub mod names {
    pub const SESSIONS_TOTAL: &str = "pmu_relay_sessions_total";
    pub const SESSIONS_ACTIVE: &str = "pmu_relay_sessions_active";
    pub const SAMPLES_TOTAL: &str = "pmu_relay_samples_total";
    pub const DECODE_ERRORS_TOTAL: &str = "pmu_relay_decode_errors_total";
    pub const ENVELOPES_DELIVERED_TOTAL: &str = "pmu_relay_envelopes_delivered_total";
    pub const ENVELOPES_DROPPED_TOTAL: &str = "pmu_relay_envelopes_dropped_total";
    pub const SESSIONS_EVICTED_TOTAL: &str = "pmu_relay_sessions_evicted_total";
    pub const INGEST_LATENCY_SECONDS: &str = "pmu_relay_ingest_latency_seconds";
}

/// Describe every relay metric to the installed recorder.
pub fn describe() {
    metrics::describe_counter!(
        names::SESSIONS_TOTAL,
        "Total number of subscriber sessions since start"
    );
    metrics::describe_gauge!(names::SESSIONS_ACTIVE, "Current number of live sessions");
    metrics::describe_counter!(names::SAMPLES_TOTAL, "Samples accepted per source");
    metrics::describe_counter!(
        names::DECODE_ERRORS_TOTAL,
        "Inbound records rejected per source"
    );
    metrics::describe_counter!(
        names::ENVELOPES_DELIVERED_TOTAL,
        "Envelopes handed to session queues"
    );
    metrics::describe_counter!(
        names::ENVELOPES_DROPPED_TOTAL,
        "Envelopes dropped from full session queues"
    );
    metrics::describe_counter!(
        names::SESSIONS_EVICTED_TOTAL,
        "Sessions removed after a failed delivery"
    );
    metrics::describe_histogram!(
        names::INGEST_LATENCY_SECONDS,
        "Time from record receipt to fan-out completion"
    );
}

/// Record an accepted sample.
pub fn record_sample(source: Source) {
    counter!(names::SAMPLES_TOTAL, "source" => source.topic()).increment(1);
}

/// Record a rejected record.
pub fn record_decode_error(source: Source) {
    counter!(names::DECODE_ERRORS_TOTAL, "source" => source.topic()).increment(1);
}

/// Record envelopes handed to sessions.
pub fn record_delivered(count: usize) {
    counter!(names::ENVELOPES_DELIVERED_TOTAL).increment(count as u64);
}

/// Record envelopes lost to queue overflow.
pub fn record_dropped(count: u64) {
    counter!(names::ENVELOPES_DROPPED_TOTAL).increment(count);
}

/// Record an eviction.
pub fn record_eviction(reason: &'static str) {
    counter!(names::SESSIONS_EVICTED_TOTAL, "reason" => reason).increment(1);
}

/// Record a newly registered session.
pub fn record_session() {
    counter!(names::SESSIONS_TOTAL).increment(1);
}

/// Update the live session gauge.
pub fn set_active_sessions(count: usize) {
    gauge!(names::SESSIONS_ACTIVE).set(count as f64);
}

/// Record ingest latency.
pub fn record_ingest_latency(seconds: f64) {
    histogram!(names::INGEST_LATENCY_SECONDS).record(seconds);
}

//! Synthetic sample channel.
//!
//! Produces plausible PMU readings at a fixed rate so the relay can run
//! without an upstream broker. With `phase_drift` enabled every voltage angle
//! gets a slow sinusoidal offset (period about a minute, peak 5 degrees), which
//! exercises the synchronization comparison.

use async_trait::async_trait;
use pmu_protocol::{codec, PmuSample};
use pmu_protocol::sample::{NOMINAL_FREQUENCY, NOMINAL_VOLTAGE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::traits::{ChannelError, RawRecord, SampleChannel};

/// Peak phase drift in degrees.
const DRIFT_AMPLITUDE_DEG: f64 = 5.0;

/// Drift angular rate: `sin(t / 10 s)`.
const DRIFT_TIME_CONSTANT_SECS: f64 = 10.0;

/// Simulator configuration.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Subject reported on every record.
    pub subject: String,
    /// Unit identifier written to `pmu_id`.
    pub pmu_id: u32,
    /// Time between records.
    pub interval: Duration,
    /// Apply the slow voltage-angle drift.
    pub phase_drift: bool,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            subject: "gridPMU".to_string(),
            pmu_id: 1,
            interval: Duration::from_millis(100),
            phase_drift: false,
            seed: None,
        }
    }
}

/// A channel producing synthetic readings forever.
pub struct SimulatedChannel {
    config: SimulatorConfig,
    rng: StdRng,
    ticker: Interval,
}

impl SimulatedChannel {
    /// Create a simulator. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut ticker = interval(config.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { config, rng, ticker }
    }

    /// Generate one sample for wall-clock time `now` (seconds since epoch).
    pub fn generate(&mut self, now: f64) -> PmuSample {
        let rng = &mut self.rng;
        let base_freq = NOMINAL_FREQUENCY + rng.random_range(-0.1..0.1);
        let base_voltage = NOMINAL_VOLTAGE + rng.random_range(-1.0..1.0);
        let drift = if self.config.phase_drift {
            (now / DRIFT_TIME_CONSTANT_SECS).sin() * DRIFT_AMPLITUDE_DEG
        } else {
            0.0
        };

        let mut sample = PmuSample::nominal(self.config.pmu_id, now);
        sample.va_mag = base_voltage + rng.random_range(-0.25..0.25);
        sample.vb_mag = base_voltage + rng.random_range(-0.25..0.25);
        sample.vc_mag = base_voltage + rng.random_range(-0.25..0.25);
        sample.va_ang = rng.random_range(-1.0..1.0) + drift;
        sample.vb_ang = -120.0 + rng.random_range(-1.0..1.0) + drift;
        sample.vc_ang = 120.0 + rng.random_range(-1.0..1.0) + drift;

        sample.ia_mag = rng.random_range(0.0..5.0);
        sample.ib_mag = rng.random_range(0.0..5.0);
        sample.ic_mag = rng.random_range(0.0..5.0);
        sample.ia_ang = rng.random_range(-180.0..180.0);
        sample.ib_ang = rng.random_range(-180.0..180.0);
        sample.ic_ang = rng.random_range(-180.0..180.0);

        sample.frequency_a = base_freq + rng.random_range(-0.025..0.025);
        sample.frequency_b = base_freq + rng.random_range(-0.025..0.025);
        sample.frequency_c = base_freq + rng.random_range(-0.025..0.025);
        sample.rocof_a = rng.random_range(-0.05..0.05);
        sample.rocof_b = rng.random_range(-0.05..0.05);
        sample.rocof_c = rng.random_range(-0.05..0.05);

        sample.pa = rng.random_range(0.0..1000.0);
        sample.pb = rng.random_range(0.0..1000.0);
        sample.pc = rng.random_range(0.0..1000.0);
        sample.qa = rng.random_range(0.0..500.0);
        sample.qb = rng.random_range(0.0..500.0);
        sample.qc = rng.random_range(0.0..500.0);
        sample.p_total = rng.random_range(0.0..3000.0);
        sample.q_total = rng.random_range(0.0..1500.0);

        sample.passthrough.stream_id_a = Some(Value::from(1));
        sample.passthrough.stream_id_b = Some(Value::from(2));
        sample.passthrough.stream_id_c = Some(Value::from(3));
        sample.passthrough.stat_a = Some(Value::from("ok"));
        sample.passthrough.stat_b = Some(Value::from("ok"));
        sample.passthrough.stat_c = Some(Value::from("ok"));
        sample
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[async_trait]
impl SampleChannel for SimulatedChannel {
    fn name(&self) -> &str {
        &self.config.subject
    }

    async fn recv(&mut self) -> Result<Option<RawRecord>, ChannelError> {
        self.ticker.tick().await;
        let sample = self.generate(unix_now());
        let payload =
            codec::encode_sample(&sample).map_err(|e| ChannelError::ReceiveFailed(e.to_string()))?;
        Ok(Some(RawRecord::new(self.config.subject.clone(), payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(phase_drift: bool) -> SimulatedChannel {
        SimulatedChannel::new(SimulatorConfig {
            subject: "microgridPMU".into(),
            pmu_id: 2,
            interval: Duration::from_millis(10),
            phase_drift,
            seed: Some(7),
        })
    }

    #[tokio::test]
    async fn test_generated_values_in_range() {
        let mut sim = seeded(false);
        for i in 0..200 {
            let s = sim.generate(1_700_000_000.0 + f64::from(i));
            assert_eq!(s.source_id, 2);
            assert!(s.first_non_finite().is_none());
            assert!((218.5..=221.5).contains(&s.va_mag));
            assert!((-1.0..=1.0).contains(&s.va_ang));
            assert!((-121.0..=-119.0).contains(&s.vb_ang));
            assert!((49.8..=50.2).contains(&s.frequency_c));
            assert!((0.0..5.0).contains(&s.ib_mag));
        }
    }

    #[tokio::test]
    async fn test_drift_shifts_voltage_angles() {
        let mut sim = seeded(true);
        // t / 10 = pi / 2, where the drift peaks.
        let t = 5.0 * std::f64::consts::PI;
        let s = sim.generate(t);
        assert!((4.0..=6.0).contains(&s.va_ang));
        assert!((-116.0..=-114.0).contains(&s.vb_ang));
    }

    #[tokio::test]
    async fn test_same_seed_same_output() {
        let a = seeded(false).generate(42.0);
        let b = seeded(false).generate(42.0);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_recv_yields_decodable_records() {
        let mut sim = seeded(true);
        for _ in 0..3 {
            let record = sim.recv().await.unwrap().unwrap();
            assert_eq!(record.subject, "microgridPMU");
            let sample = codec::decode_sample(&record.payload).unwrap();
            assert_eq!(sample.passthrough.stat_b, Some(Value::from("ok")));
        }
    }
}

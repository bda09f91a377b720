//! PMU measurement samples.
//!
//! A [`PmuSample`] is one measurement snapshot from one phasor measurement
//! unit at one instant. The struct mirrors the flat JSON record the upstream
//! producer emits, so serde field names follow the wire (`va_mag`, `Pa`,
//! `P_total`, ...). Samples are never mutated after they have been accepted
//! into the relay; they are shared behind an `Arc`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Nominal line-to-neutral voltage magnitude in volts.
pub const NOMINAL_VOLTAGE: f64 = 220.0;

/// Nominal system frequency in Hz.
pub const NOMINAL_FREQUENCY: f64 = 50.0;

/// Wire names of every numeric field a record must carry, in declaration order.
pub const REQUIRED_FIELDS: [&str; 28] = [
    "pmu_id",
    "time",
    "va_mag",
    "vb_mag",
    "vc_mag",
    "va_ang",
    "vb_ang",
    "vc_ang",
    "ia_mag",
    "ib_mag",
    "ic_mag",
    "ia_ang",
    "ib_ang",
    "ic_ang",
    "frequency_a",
    "frequency_b",
    "frequency_c",
    "rocof_a",
    "rocof_b",
    "rocof_c",
    "Pa",
    "Pb",
    "Pc",
    "Qa",
    "Qb",
    "Qc",
    "P_total",
    "Q_total",
];

/// One of the three phases of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    A,
    B,
    C,
}

impl Phase {
    /// All phases in A, B, C order.
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    /// Lowercase phase letter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::A => "a",
            Phase::B => "b",
            Phase::C => "c",
        }
    }

    /// Index of the phase in [`Phase::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All per-phase readings of a sample, gathered for one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseReading {
    /// Voltage magnitude in volts.
    pub voltage_magnitude: f64,
    /// Voltage angle in degrees, unbounded as received.
    pub voltage_angle: f64,
    /// Current magnitude in amperes.
    pub current_magnitude: f64,
    /// Current angle in degrees.
    pub current_angle: f64,
    /// Frequency in Hz.
    pub frequency: f64,
    /// Rate of change of frequency in Hz/s.
    pub rocof: f64,
    /// Active power.
    pub active_power: f64,
    /// Reactive power.
    pub reactive_power: f64,
}

/// Fields the relay carries through untouched for downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Passthrough {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id_a: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id_b: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id_c: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_a: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_b: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_c: Option<Value>,
}

/// One measurement snapshot from one source.
///
/// Use [`crate::codec::decode_sample`] to build one from an inbound record;
/// it guarantees every numeric field is present and finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmuSample {
    /// Identifier of the measuring unit.
    #[serde(rename = "pmu_id")]
    pub source_id: u32,
    /// Seconds since the Unix epoch.
    #[serde(rename = "time")]
    pub timestamp: f64,

    pub va_mag: f64,
    pub vb_mag: f64,
    pub vc_mag: f64,
    pub va_ang: f64,
    pub vb_ang: f64,
    pub vc_ang: f64,

    pub ia_mag: f64,
    pub ib_mag: f64,
    pub ic_mag: f64,
    pub ia_ang: f64,
    pub ib_ang: f64,
    pub ic_ang: f64,

    pub frequency_a: f64,
    pub frequency_b: f64,
    pub frequency_c: f64,
    pub rocof_a: f64,
    pub rocof_b: f64,
    pub rocof_c: f64,

    #[serde(rename = "Pa")]
    pub pa: f64,
    #[serde(rename = "Pb")]
    pub pb: f64,
    #[serde(rename = "Pc")]
    pub pc: f64,
    #[serde(rename = "Qa")]
    pub qa: f64,
    #[serde(rename = "Qb")]
    pub qb: f64,
    #[serde(rename = "Qc")]
    pub qc: f64,

    /// Aggregate active power.
    #[serde(rename = "P_total")]
    pub p_total: f64,
    /// Aggregate reactive power.
    #[serde(rename = "Q_total")]
    pub q_total: f64,

    #[serde(flatten)]
    pub passthrough: Passthrough,
}

impl PmuSample {
    /// A balanced, unloaded three-phase sample at nominal voltage and frequency.
    #[must_use]
    pub fn nominal(source_id: u32, timestamp: f64) -> Self {
        Self {
            source_id,
            timestamp,
            va_mag: NOMINAL_VOLTAGE,
            vb_mag: NOMINAL_VOLTAGE,
            vc_mag: NOMINAL_VOLTAGE,
            va_ang: 0.0,
            vb_ang: -120.0,
            vc_ang: 120.0,
            ia_mag: 0.0,
            ib_mag: 0.0,
            ic_mag: 0.0,
            ia_ang: 0.0,
            ib_ang: -120.0,
            ic_ang: 120.0,
            frequency_a: NOMINAL_FREQUENCY,
            frequency_b: NOMINAL_FREQUENCY,
            frequency_c: NOMINAL_FREQUENCY,
            rocof_a: 0.0,
            rocof_b: 0.0,
            rocof_c: 0.0,
            pa: 0.0,
            pb: 0.0,
            pc: 0.0,
            qa: 0.0,
            qb: 0.0,
            qc: 0.0,
            p_total: 0.0,
            q_total: 0.0,
            passthrough: Passthrough::default(),
        }
    }

    /// Replace one phase's voltage phasor.
    #[must_use]
    pub fn with_voltage(mut self, phase: Phase, magnitude: f64, angle: f64) -> Self {
        let (mag, ang) = match phase {
            Phase::A => (&mut self.va_mag, &mut self.va_ang),
            Phase::B => (&mut self.vb_mag, &mut self.vb_ang),
            Phase::C => (&mut self.vc_mag, &mut self.vc_ang),
        };
        *mag = magnitude;
        *ang = angle;
        self
    }

    /// Gather the readings of a single phase.
    #[must_use]
    pub fn phase(&self, phase: Phase) -> PhaseReading {
        match phase {
            Phase::A => PhaseReading {
                voltage_magnitude: self.va_mag,
                voltage_angle: self.va_ang,
                current_magnitude: self.ia_mag,
                current_angle: self.ia_ang,
                frequency: self.frequency_a,
                rocof: self.rocof_a,
                active_power: self.pa,
                reactive_power: self.qa,
            },
            Phase::B => PhaseReading {
                voltage_magnitude: self.vb_mag,
                voltage_angle: self.vb_ang,
                current_magnitude: self.ib_mag,
                current_angle: self.ib_ang,
                frequency: self.frequency_b,
                rocof: self.rocof_b,
                active_power: self.pb,
                reactive_power: self.qb,
            },
            Phase::C => PhaseReading {
                voltage_magnitude: self.vc_mag,
                voltage_angle: self.vc_ang,
                current_magnitude: self.ic_mag,
                current_angle: self.ic_ang,
                frequency: self.frequency_c,
                rocof: self.rocof_c,
                active_power: self.pc,
                reactive_power: self.qc,
            },
        }
    }

    /// Every floating-point field paired with its wire name.
    #[must_use]
    pub fn numeric_fields(&self) -> [(&'static str, f64); 27] {
        [
            ("time", self.timestamp),
            ("va_mag", self.va_mag),
            ("vb_mag", self.vb_mag),
            ("vc_mag", self.vc_mag),
            ("va_ang", self.va_ang),
            ("vb_ang", self.vb_ang),
            ("vc_ang", self.vc_ang),
            ("ia_mag", self.ia_mag),
            ("ib_mag", self.ib_mag),
            ("ic_mag", self.ic_mag),
            ("ia_ang", self.ia_ang),
            ("ib_ang", self.ib_ang),
            ("ic_ang", self.ic_ang),
            ("frequency_a", self.frequency_a),
            ("frequency_b", self.frequency_b),
            ("frequency_c", self.frequency_c),
            ("rocof_a", self.rocof_a),
            ("rocof_b", self.rocof_b),
            ("rocof_c", self.rocof_c),
            ("Pa", self.pa),
            ("Pb", self.pb),
            ("Pc", self.pc),
            ("Qa", self.qa),
            ("Qb", self.qb),
            ("Qc", self.qc),
            ("P_total", self.p_total),
            ("Q_total", self.q_total),
        ]
    }

    /// Name of the first non-finite field, if any.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.numeric_fields()
            .into_iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_sample_is_balanced() {
        let sample = PmuSample::nominal(1, 1_700_000_000.0);
        let a = sample.phase(Phase::A);
        let b = sample.phase(Phase::B);
        let c = sample.phase(Phase::C);

        assert_eq!(a.voltage_magnitude, NOMINAL_VOLTAGE);
        assert_eq!(b.voltage_angle, -120.0);
        assert_eq!(c.voltage_angle, 120.0);
        assert_eq!(a.frequency, NOMINAL_FREQUENCY);
        assert!(sample.first_non_finite().is_none());
    }

    #[test]
    fn test_with_voltage_touches_only_one_phase() {
        let sample = PmuSample::nominal(1, 0.0).with_voltage(Phase::B, 219.5, -117.0);
        assert_eq!(sample.vb_mag, 219.5);
        assert_eq!(sample.vb_ang, -117.0);
        assert_eq!(sample.va_mag, NOMINAL_VOLTAGE);
        assert_eq!(sample.vc_ang, 120.0);
    }

    #[test]
    fn test_first_non_finite() {
        let mut sample = PmuSample::nominal(2, 0.0);
        sample.rocof_b = f64::NAN;
        assert_eq!(sample.first_non_finite(), Some("rocof_b"));

        sample.rocof_b = 0.0;
        sample.q_total = f64::INFINITY;
        assert_eq!(sample.first_non_finite(), Some("Q_total"));
    }

    #[test]
    fn test_numeric_fields_match_required_fields() {
        let sample = PmuSample::nominal(1, 0.0);
        let names: Vec<&str> = sample.numeric_fields().iter().map(|(n, _)| *n).collect();
        // Every float is required; `pmu_id` is the only non-float requirement.
        assert_eq!(&REQUIRED_FIELDS[1..], names.as_slice());
    }

    #[test]
    fn test_phase_index() {
        for (i, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
        assert_eq!(Phase::C.to_string(), "c");
    }
}

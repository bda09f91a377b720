//! Synchronization analysis between the grid and microgrid samples.
//!
//! For each phase the analyzer reports the voltage angle difference, wrapped
//! into `(-180, 180]` degrees, and the plain signed voltage magnitude
//! difference. Both are `grid - microgrid`.

use pmu_protocol::{Phase, PmuSample, SourcePair};
use serde::Serialize;

/// Wrap an angle in degrees into `(-180, 180]`.
///
/// Values already in range are returned unchanged, so the function is
/// idempotent. Any finite input is accepted, however many turns away it is.
#[must_use]
pub fn normalize_angle(degrees: f64) -> f64 {
    if degrees > -180.0 && degrees <= 180.0 {
        return degrees;
    }
    // `%` is exact for floats; the single correction below is exact by Sterbenz.
    let wrapped = degrees % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Differences for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDifference {
    /// Voltage angle difference in degrees, in `(-180, 180]`.
    pub angle_difference: f64,
    /// Voltage magnitude difference in volts.
    pub magnitude_difference: f64,
}

impl PhaseDifference {
    fn between(grid: &PmuSample, microgrid: &PmuSample, phase: Phase) -> Self {
        let g = grid.phase(phase);
        let m = microgrid.phase(phase);
        Self {
            angle_difference: normalize_angle(g.voltage_angle - m.voltage_angle),
            magnitude_difference: g.voltage_magnitude - m.voltage_magnitude,
        }
    }
}

/// Per-phase comparison of the two sources' latest samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SynchronizationSnapshot {
    pub a: PhaseDifference,
    pub b: PhaseDifference,
    pub c: PhaseDifference,
}

impl SynchronizationSnapshot {
    /// Differences for one phase.
    #[must_use]
    pub fn phase(&self, phase: Phase) -> &PhaseDifference {
        match phase {
            Phase::A => &self.a,
            Phase::B => &self.b,
            Phase::C => &self.c,
        }
    }

    /// Largest absolute angle difference across the phases.
    #[must_use]
    pub fn max_angle_deviation(&self) -> f64 {
        Phase::ALL
            .iter()
            .map(|p| self.phase(*p).angle_difference.abs())
            .fold(0.0, f64::max)
    }
}

/// Compare two samples. Returns `None` unless both are present.
#[must_use]
pub fn analyze(
    grid: Option<&PmuSample>,
    microgrid: Option<&PmuSample>,
) -> Option<SynchronizationSnapshot> {
    let (grid, microgrid) = (grid?, microgrid?);
    Some(SynchronizationSnapshot {
        a: PhaseDifference::between(grid, microgrid, Phase::A),
        b: PhaseDifference::between(grid, microgrid, Phase::B),
        c: PhaseDifference::between(grid, microgrid, Phase::C),
    })
}

/// Compare the latest samples of a pair.
#[must_use]
pub fn analyze_pair(pair: &SourcePair) -> Option<SynchronizationSnapshot> {
    analyze(pair.grid.as_deref(), pair.microgrid.as_deref())
}

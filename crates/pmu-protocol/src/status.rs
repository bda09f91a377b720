//! Body of the relay's status endpoint.

use crate::frames::SourcePair;
use serde::{Deserialize, Serialize};

/// Whether a source has reported at least one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataAvailability {
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "no data")]
    NoData,
}

impl DataAvailability {
    fn of<T>(slot: &Option<T>) -> Self {
        if slot.is_some() {
            DataAvailability::Available
        } else {
            DataAvailability::NoData
        }
    }
}

/// Availability of each source's latest sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestAvailability {
    #[serde(rename = "gridPMU")]
    pub grid: DataAvailability,
    #[serde(rename = "microgridPMU")]
    pub microgrid: DataAvailability,
}

impl From<&SourcePair> for LatestAvailability {
    fn from(pair: &SourcePair) -> Self {
        Self {
            grid: DataAvailability::of(&pair.grid),
            microgrid: DataAvailability::of(&pair.microgrid),
        }
    }
}

/// Relay health summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// RFC 3339 time the report was generated.
    pub timestamp: String,
    /// Number of live subscriber sessions.
    pub connections: usize,
    #[serde(rename = "latestData")]
    pub latest_data: LatestAvailability,
}

impl StatusReport {
    /// Build a healthy report.
    #[must_use]
    pub fn healthy(timestamp: impl Into<String>, connections: usize, pair: &SourcePair) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: timestamp.into(),
            connections,
            latest_data: LatestAvailability::from(pair),
        }
    }
}

//! Frames pushed from the relay to subscribers.
//!
//! Every frame is a JSON object tagged by `type`. The relay currently emits a
//! single frame type, `data`, carrying an [`Envelope`].

use crate::sample::PmuSample;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// One of the two logical measurement sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The utility grid side of the point of common coupling.
    #[serde(rename = "gridPMU")]
    Grid,
    /// The microgrid side.
    #[serde(rename = "microgridPMU")]
    Microgrid,
}

impl Source {
    /// Both sources, grid first.
    pub const ALL: [Source; 2] = [Source::Grid, Source::Microgrid];

    /// Topic name used on the wire and as the default inbound subject.
    #[must_use]
    pub fn topic(self) -> &'static str {
        match self {
            Source::Grid => "gridPMU",
            Source::Microgrid => "microgridPMU",
        }
    }

    /// Look a source up by its topic name.
    #[must_use]
    pub fn from_topic(topic: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.topic() == topic)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_topic(s).ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// Error returned when parsing a topic that names no source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown source topic: {0}")]
pub struct UnknownSource(pub String);

/// The latest sample of each source.
///
/// Also the body of the `/api/latest` query endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePair {
    #[serde(rename = "gridPMU")]
    pub grid: Option<Arc<PmuSample>>,
    #[serde(rename = "microgridPMU")]
    pub microgrid: Option<Arc<PmuSample>>,
}

impl SourcePair {
    /// Latest sample of one source.
    #[must_use]
    pub fn get(&self, source: Source) -> Option<&Arc<PmuSample>> {
        match source {
            Source::Grid => self.grid.as_ref(),
            Source::Microgrid => self.microgrid.as_ref(),
        }
    }

    /// Replace the latest sample of one source.
    pub fn set(&mut self, source: Source, sample: Arc<PmuSample>) {
        match source {
            Source::Grid => self.grid = Some(sample),
            Source::Microgrid => self.microgrid = Some(sample),
        }
    }

    /// `true` when neither source has reported yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid.is_none() && self.microgrid.is_none()
    }

    /// `true` when both sources have reported.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.grid.is_some() && self.microgrid.is_some()
    }
}

/// The combined message pushed to subscribers.
///
/// `topic` and `data` are set when a specific inbound sample triggered the
/// push and omitted for the state sync sent to a newly joined subscriber.
/// `grid` and `microgrid` always carry the full current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Arc<PmuSample>>,
    #[serde(rename = "gridPMU")]
    pub grid: Option<Arc<PmuSample>>,
    #[serde(rename = "microgridPMU")]
    pub microgrid: Option<Arc<PmuSample>>,
}

impl Envelope {
    /// Envelope for a sample that just updated `topic`.
    #[must_use]
    pub fn update(topic: Source, data: Arc<PmuSample>, pair: &SourcePair) -> Self {
        Self {
            topic: Some(topic),
            data: Some(data),
            grid: pair.grid.clone(),
            microgrid: pair.microgrid.clone(),
        }
    }

    /// State-sync envelope carrying only the current pair.
    #[must_use]
    pub fn sync(pair: &SourcePair) -> Self {
        Self {
            topic: None,
            data: None,
            grid: pair.grid.clone(),
            microgrid: pair.microgrid.clone(),
        }
    }

    /// `true` for a state-sync envelope.
    #[must_use]
    pub fn is_sync(&self) -> bool {
        self.topic.is_none()
    }
}

/// A frame pushed to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// A data envelope.
    #[serde(rename = "data")]
    Data(Envelope),
}

impl From<Envelope> for Frame {
    fn from(envelope: Envelope) -> Self {
        Frame::Data(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_topics() {
        assert_eq!(Source::Grid.topic(), "gridPMU");
        assert_eq!(Source::from_topic("microgridPMU"), Some(Source::Microgrid));
        assert_eq!(Source::from_topic("gridpmu"), None);
        assert!("nope".parse::<Source>().is_err());
        assert_eq!("gridPMU".parse::<Source>(), Ok(Source::Grid));
    }

    #[test]
    fn test_source_pair() {
        let mut pair = SourcePair::default();
        assert!(pair.is_empty());
        assert!(!pair.is_complete());

        pair.set(Source::Microgrid, Arc::new(PmuSample::nominal(2, 0.0)));
        assert!(!pair.is_empty());
        assert!(!pair.is_complete());
        assert!(pair.get(Source::Grid).is_none());
        assert_eq!(pair.get(Source::Microgrid).map(|s| s.source_id), Some(2));

        pair.set(Source::Grid, Arc::new(PmuSample::nominal(1, 0.0)));
        assert!(pair.is_complete());
    }

    #[test]
    fn test_envelope_constructors() {
        let grid = Arc::new(PmuSample::nominal(1, 10.0));
        let pair = SourcePair {
            grid: Some(Arc::clone(&grid)),
            microgrid: None,
        };

        let update = Envelope::update(Source::Grid, Arc::clone(&grid), &pair);
        assert!(!update.is_sync());
        assert_eq!(update.grid, pair.grid);
        assert!(update.microgrid.is_none());

        let sync = Envelope::sync(&pair);
        assert!(sync.is_sync());
        assert!(sync.data.is_none());
        assert_eq!(sync.grid, Some(grid));
    }
}

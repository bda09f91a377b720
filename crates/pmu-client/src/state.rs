//! Consumer-side state.

use chrono::{DateTime, Utc};
use pmu_core::{analyze, SynchronizationSnapshot};
use pmu_protocol::{Envelope, PmuSample};
use std::fmt;
use std::sync::Arc;

/// Connection status shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// What happened to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A dial attempt started.
    Dial,
    /// The handshake completed.
    Opened,
    /// The peer closed the connection.
    Closed,
    /// The dial or the stream failed.
    Failed,
}

impl ConnectionState {
    /// Next state after `event`. Events that make no sense in the current
    /// state leave it unchanged.
    #[must_use]
    pub fn transition(self, event: ConnectionEvent) -> Self {
        use ConnectionEvent::{Closed, Dial, Failed, Opened};
        match (self, event) {
            (Self::Disconnected, Dial) => Self::Connecting,
            (Self::Connecting, Opened) => Self::Connected,
            (Self::Connecting | Self::Connected, Closed | Failed) => Self::Disconnected,
            (state, _) => state,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dashboard's view of both sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub grid: Option<Arc<PmuSample>>,
    pub microgrid: Option<Arc<PmuSample>>,
    /// When the last envelope was applied.
    pub last_update: Option<DateTime<Utc>>,
}

impl DashboardState {
    /// Apply an envelope received now.
    pub fn apply(&mut self, envelope: &Envelope) {
        self.apply_at(envelope, Utc::now());
    }

    /// Apply an envelope. Both slots take exactly the envelope's values,
    /// whichever source triggered it.
    pub fn apply_at(&mut self, envelope: &Envelope, at: DateTime<Utc>) {
        self.grid.clone_from(&envelope.grid);
        self.microgrid.clone_from(&envelope.microgrid);
        self.last_update = Some(at);
    }

    /// Comparison of the two current samples, if both are known.
    #[must_use]
    pub fn synchronization(&self) -> Option<SynchronizationSnapshot> {
        analyze(self.grid.as_deref(), self.microgrid.as_deref())
    }
}

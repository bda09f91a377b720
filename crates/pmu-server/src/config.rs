//! Relay configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (PMU_RELAY_*)
//! - TOML configuration file
//! - A config path given as the first command line argument

use anyhow::{Context, Result};
use pmu_protocol::Source;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PMU_RELAY_CONFIG";

/// Relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Subscriber transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Inbound channel configuration.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Subscriber transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Path for the WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub websocket_path: String,

    /// Upper bound for writing one envelope to a socket.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,

    /// Pending envelopes kept per session before the oldest are dropped.
    #[serde(default = "default_queue_capacity")]
    pub session_queue_capacity: usize,
}

/// Where samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestKind {
    /// Subscribe to a NATS server.
    Nats,
    /// Generate synthetic samples in-process.
    Simulated,
}

/// Inbound channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_ingest_kind")]
    pub kind: IngestKind,

    /// NATS server URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject carrying grid samples.
    #[serde(default = "default_grid_subject")]
    pub grid_subject: String,

    /// Subject carrying microgrid samples.
    #[serde(default = "default_microgrid_subject")]
    pub microgrid_subject: String,

    /// Interval between synthetic samples.
    #[serde(default = "default_simulation_interval")]
    pub simulation_interval_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("PMU_RELAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("PMU_RELAY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001)
}

fn default_true() -> bool {
    true
}

fn default_ws_path() -> String {
    "/".to_string()
}

fn default_send_timeout() -> u64 {
    5_000 // 5 seconds
}

fn default_queue_capacity() -> usize {
    64
}

fn default_ingest_kind() -> IngestKind {
    IngestKind::Nats
}

fn default_nats_url() -> String {
    std::env::var("PMU_RELAY_NATS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".to_string())
}

fn default_grid_subject() -> String {
    "gridPMU".to_string()
}

fn default_microgrid_subject() -> String {
    "microgridPMU".to_string()
}

fn default_simulation_interval() -> u64 {
    100
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            transport: TransportConfig::default(),
            ingest: IngestConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            websocket_path: default_ws_path(),
            send_timeout_ms: default_send_timeout(),
            session_queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            kind: default_ingest_kind(),
            nats_url: default_nats_url(),
            grid_subject: default_grid_subject(),
            microgrid_subject: default_microgrid_subject(),
            simulation_interval_ms: default_simulation_interval(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl IngestConfig {
    /// Subject carrying `source`.
    #[must_use]
    pub fn subject(&self, source: Source) -> &str {
        match source {
            Source::Grid => &self.grid_subject,
            Source::Microgrid => &self.microgrid_subject,
        }
    }

    #[must_use]
    pub fn simulation_interval(&self) -> Duration {
        Duration::from_millis(self.simulation_interval_ms)
    }
}

impl Config {
    /// Load configuration, preferring an explicit path.
    ///
    /// An explicit path that does not exist is an error; otherwise the
    /// default locations are searched.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read or parsed.
    pub fn load_from(explicit: Option<&str>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(shellexpand::tilde(path).as_ref()),
            None => Self::load(),
        }
    }

    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        // Try to load from default paths
        let config_paths = [
            "pmu-relay.toml",
            "/etc/pmu-relay/pmu-relay.toml",
            "~/.config/pmu-relay/pmu-relay.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

//! # PMU Relay
//!
//! Realtime relay for grid and microgrid synchrophasor samples.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! pmu-relay
//!
//! # Run with a specific config file
//! pmu-relay /path/to/pmu-relay.toml
//!
//! # Run with environment variables
//! PMU_RELAY_PORT=8080 PMU_RELAY_NATS_URL=nats://broker:4222 pmu-relay
//! ```

use anyhow::Result;
use pmu_relay::config::{self, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pmu_relay=info,pmu_core=info,pmu_transport=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let explicit = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(config::CONFIG_ENV).ok());
    let config = Config::load_from(explicit.as_deref())?;

    tracing::info!(
        "Starting PMU relay on {}:{} ({:?} ingest)",
        config.host,
        config.port,
        config.ingest.kind
    );

    pmu_relay::server::run(config).await
}

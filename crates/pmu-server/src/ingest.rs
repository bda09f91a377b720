//! Inbound channel startup.
//!
//! Both channels must be established before the relay starts serving.
//! Each then runs as its own task.

use anyhow::{anyhow, Context, Error, Result};
use pmu_core::{IngestAdapter, IngestStats};
use pmu_protocol::Source;
use pmu_transport::{ChannelError, NatsConnector, SampleChannel, SimulatedChannel, SimulatorConfig};
use tokio::task::{JoinError, JoinSet};
use tracing::info;

use crate::config::{IngestConfig, IngestKind};

/// Result of one finished ingest task.
pub type IngestOutcome = (Source, Result<IngestStats, ChannelError>);

/// Open both inbound channels and start consuming them.
///
/// # Errors
///
/// Returns an error if either channel cannot be established.
pub async fn start(config: &IngestConfig, adapter: &IngestAdapter) -> Result<JoinSet<IngestOutcome>> {
    let mut tasks = JoinSet::new();
    match config.kind {
        IngestKind::Nats => {
            let connector = NatsConnector::connect(&config.nats_url)
                .await
                .context("Failed to connect to the inbound broker")?;
            for source in Source::ALL {
                let subject = config.subject(source);
                let channel = connector
                    .subscribe(subject)
                    .await
                    .with_context(|| format!("Failed to subscribe to {subject}"))?;
                spawn(&mut tasks, adapter.clone(), source, channel);
            }
        }
        IngestKind::Simulated => {
            info!(interval_ms = config.simulation_interval_ms, "Using simulated samples");
            for (pmu_id, source) in (1..).zip(Source::ALL) {
                let channel = SimulatedChannel::new(SimulatorConfig {
                    subject: config.subject(source).to_string(),
                    pmu_id,
                    interval: config.simulation_interval(),
                    phase_drift: source == Source::Microgrid,
                    seed: None,
                });
                spawn(&mut tasks, adapter.clone(), source, channel);
            }
        }
    }
    Ok(tasks)
}

fn spawn<C>(tasks: &mut JoinSet<IngestOutcome>, adapter: IngestAdapter, source: Source, channel: C)
where
    C: SampleChannel + 'static,
{
    tasks.spawn(async move { (source, adapter.run(source, channel).await) });
}

/// Turn a finished ingest task into the error that stops the relay.
#[must_use]
pub fn ended(outcome: Option<Result<IngestOutcome, JoinError>>) -> Error {
    match outcome {
        Some(Ok((source, Ok(stats)))) => anyhow!(
            "{source} channel closed after {} samples ({} rejected)",
            stats.accepted,
            stats.rejected
        ),
        Some(Ok((source, Err(err)))) => Error::new(err).context(format!("{source} ingest failed")),
        Some(Err(err)) => Error::new(err).context("Ingest task panicked"),
        None => anyhow!("No ingest channels running"),
    }
}

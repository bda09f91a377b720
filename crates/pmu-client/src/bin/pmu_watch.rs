//! Terminal watcher for the PMU relay.
//!
//! Logs connection changes and the synchronization snapshot after every
//! envelope.
//!
//! ```bash
//! pmu-watch ws://relay.local:3001/
//! PMU_WATCH_URL=ws://relay.local:3001/ pmu-watch
//! ```

use anyhow::Result;
use pmu_client::{ConnectionState, SubscriberSession};
use pmu_protocol::Phase;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_URL: &str = "ws://127.0.0.1:3001/";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pmu_watch=info,pmu_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PMU_WATCH_URL").ok())
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    let session = Arc::new(SubscriberSession::new(url));
    let mut state = session.connection_state();
    let mut dashboard = session.dashboard();
    info!(url = session.url(), "Watching relay");

    let runner = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run().await }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = state.changed() => {
                let current = *state.borrow_and_update();
                match current {
                    ConnectionState::Disconnected => warn!(status = %current, "Connection status"),
                    _ => info!(status = %current, "Connection status"),
                }
            }
            Ok(()) = dashboard.changed() => {
                let view = dashboard.borrow_and_update().clone();
                match view.synchronization() {
                    Some(sync) => {
                        for phase in Phase::ALL {
                            let diff = sync.phase(phase);
                            info!(
                                phase = %phase,
                                angle_diff = diff.angle_difference,
                                mag_diff = diff.magnitude_difference,
                                "Synchronization"
                            );
                        }
                    }
                    None => info!(
                        grid = view.grid.is_some(),
                        microgrid = view.microgrid.is_some(),
                        "Waiting for both sources"
                    ),
                }
            }
        }
    }

    runner.abort();
    info!("Stopped");
    Ok(())
}

//! Reconnecting subscriber session.
//!
//! [`SubscriberSession::run`] dials the relay, applies every envelope it
//! receives, and after any close or failure waits a fixed delay before
//! dialing again. It never gives up.

use futures_util::StreamExt;
use pmu_protocol::{codec, Envelope, Frame, ProtocolError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use crate::state::{ConnectionEvent, ConnectionState, DashboardState};

/// Delay between a lost connection and the next dial.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("WebSocket error: {0}")]
    Stream(#[from] tungstenite::Error),

    #[error("Malformed envelope: {0}")]
    Decode(#[from] ProtocolError),
}

/// Decode one text frame into an envelope.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] if the text is not a data frame.
pub fn decode_envelope(text: &str) -> Result<Envelope, ClientError> {
    let Frame::Data(envelope) = codec::decode(text)?;
    Ok(envelope)
}

pub struct SubscriberSession {
    url: String,
    reconnect_delay: Duration,
    state: watch::Sender<ConnectionState>,
    dashboard: watch::Sender<DashboardState>,
}

impl SubscriberSession {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            state: watch::Sender::new(ConnectionState::Disconnected),
            dashboard: watch::Sender::new(DashboardState::default()),
        }
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Watch the connection state.
    #[must_use]
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Watch the dashboard state.
    #[must_use]
    pub fn dashboard(&self) -> watch::Receiver<DashboardState> {
        self.dashboard.subscribe()
    }

    /// Connect and stay connected, forever.
    pub async fn run(&self) {
        loop {
            self.on(ConnectionEvent::Dial);
            match self.connect_once().await {
                Ok(()) => {
                    info!(url = %self.url, "Connection closed by relay");
                    self.on(ConnectionEvent::Closed);
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "Connection failed");
                    self.on(ConnectionEvent::Failed);
                }
            }
            debug!(delay_ms = self.reconnect_delay.as_millis() as u64, "Reconnecting after delay");
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn connect_once(&self) -> Result<(), ClientError> {
        let (mut ws, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|source| ClientError::Connect {
                url: self.url.clone(),
                source,
            })?;
        self.on(ConnectionEvent::Opened);
        info!(url = %self.url, "Connected");

        while let Some(message) = ws.next().await {
            match message? {
                Message::Text(text) => match decode_envelope(&text) {
                    Ok(envelope) => self.dashboard.send_modify(|d| d.apply(&envelope)),
                    Err(e) => warn!(error = %e, "Skipping frame"),
                },
                Message::Close(_) => return Ok(()),
                _ => {}
            }
        }
        Ok(())
    }

    fn on(&self, event: ConnectionEvent) {
        self.state.send_if_modified(|state| {
            let next = state.transition(event);
            let changed = next != *state;
            *state = next;
            changed
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use pmu_protocol::{PmuSample, Source, SourcePair};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn envelope_text(grid_ts: f64) -> String {
        let sample = Arc::new(PmuSample::nominal(1, grid_ts));
        let pair = SourcePair {
            grid: Some(Arc::clone(&sample)),
            microgrid: None,
        };
        codec::encode_envelope(&Envelope::update(Source::Grid, sample, &pair)).unwrap()
    }

    /// Accepts one connection per entry in `scripts`, sends its frames and closes.
    async fn scripted_relay(scripts: Vec<Vec<String>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for frames in scripts {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                for text in frames {
                    ws.send(Message::Text(text)).await.unwrap();
                }
                ws.close(None).await.unwrap();
            }
            // Keep the last connection's peer waiting instead of refusing.
            let (_stream, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });
        format!("ws://{addr}/")
    }

    async fn wait_for_grid(dashboard: &mut watch::Receiver<DashboardState>, ts: f64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if dashboard.borrow_and_update().grid.as_ref().map(|s| s.timestamp) == Some(ts) {
                    return;
                }
                dashboard.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_decode_envelope_rejects_garbage() {
        assert!(matches!(
            decode_envelope("{\"type\":\"nope\"}"),
            Err(ClientError::Decode(_))
        ));
        assert!(decode_envelope(&envelope_text(1.0)).is_ok());
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let url = scripted_relay(vec![vec![envelope_text(1.0)], vec![envelope_text(2.0)]]).await;
        let session = Arc::new(SubscriberSession::new(url).with_reconnect_delay(Duration::from_millis(20)));
        let mut dashboard = session.dashboard();

        let runner = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.run().await }
        });

        // 2.0 is only sent on the second connection.
        wait_for_grid(&mut dashboard, 2.0).await;
        runner.abort();
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let url = scripted_relay(vec![vec!["not json".to_string(), envelope_text(7.0)]]).await;
        let session = Arc::new(SubscriberSession::new(url).with_reconnect_delay(Duration::from_millis(20)));
        let mut dashboard = session.dashboard();

        let runner = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.run().await }
        });

        wait_for_grid(&mut dashboard, 7.0).await;
        runner.abort();
    }

    #[tokio::test]
    async fn test_failed_handshakes_keep_retrying() {
        // Accepts TCP and hangs up at once, so every handshake fails.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let session = Arc::new(
            SubscriberSession::new(format!("ws://{addr}/"))
                .with_reconnect_delay(Duration::from_millis(10)),
        );
        let state = session.connection_state();

        let runner = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.run().await }
        });

        for _ in 0..3 {
            let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
                .await
                .unwrap()
                .unwrap();
            drop(stream);
        }
        assert_ne!(*state.borrow(), ConnectionState::Connected);
        runner.abort();
    }
}

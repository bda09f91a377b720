//! HTTP and WebSocket handlers.
//!
//! Each WebSocket connection becomes one relay session. The session's queue
//! is drained by the connection task, which bounds every socket write by the
//! configured send timeout.

use crate::config::Config;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use futures_util::{SinkExt, StreamExt};
use pmu_core::{metrics, queued_session, DeliveryError, Relay, SessionId, SessionSink};
use pmu_protocol::{SourcePair, StatusReport};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Shared server state.
pub struct AppState {
    /// The relay engine.
    pub relay: Arc<Relay>,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    #[must_use]
    pub fn new(relay: Arc<Relay>, config: Config) -> Self {
        Self { relay, config }
    }
}

/// Build the HTTP router.
///
/// - `GET <websocket_path>` upgrades to the live envelope stream
/// - `GET /health` returns a [`StatusReport`]
/// - `GET /api/latest` returns the current [`SourcePair`]
pub fn build_router(state: Arc<AppState>) -> Router {
    let ws_path = state.config.transport.websocket_path.clone();
    Router::new()
        .route(&ws_path, get(ws_handler))
        .route("/health", get(health_handler))
        .route("/api/latest", get(latest_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Json(StatusReport::healthy(
        timestamp,
        state.relay.session_count(),
        &state.relay.snapshot(),
    ))
}

/// Latest sample of each source.
async fn latest_handler(State(state): State<Arc<AppState>>) -> Json<SourcePair> {
    Json(state.relay.snapshot())
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Removes the session from the relay when the connection task ends.
struct SessionGuard<'a> {
    relay: &'a Relay,
    id: SessionId,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.relay.unsubscribe(self.id);
    }
}

/// Handle a WebSocket connection.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let transport = &state.config.transport;
    let (session, mut outbound) = queued_session(transport.session_queue_capacity);
    let id = session.id();

    if let Err(e) = state.relay.subscribe(session) {
        warn!(session = %id, error = %e, "Could not register session");
        return;
    }
    let _guard = SessionGuard {
        relay: &state.relay,
        id,
    };
    debug!(session = %id, sessions = state.relay.session_count(), "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();
    let send_timeout = transport.send_timeout();

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    debug!(session = %id, "Session removed by relay");
                    break;
                };
                let write = sender.send(Message::Text(message.text.clone()));
                let failure = match tokio::time::timeout(send_timeout, write).await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(DeliveryError::Failed(e.to_string())),
                    Err(_) => Some(DeliveryError::Timeout),
                };
                if let Some(err) = failure {
                    warn!(session = %id, error = %err, "Evicting session");
                    metrics::record_eviction(err.reason());
                    break;
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(session = %id, "Received close frame");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Subscribers have nothing to say.
                    }
                    Some(Err(e)) => {
                        warn!(session = %id, error = %e, "WebSocket error");
                        break;
                    }
                    None => {
                        debug!(session = %id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    debug!(
        session = %id,
        dropped = outbound.dropped(),
        "WebSocket disconnected"
    );
}

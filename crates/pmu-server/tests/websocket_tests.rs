//! WebSocket tests against a real listener.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use pmu_core::Relay;
use pmu_protocol::{codec, Frame, PmuSample, Source};
use pmu_relay::{build_router, AppState, Config};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

async fn serve(relay: Arc<Relay>) -> String {
    let config: Config = toml::from_str("").unwrap();
    let app = build_router(Arc::new(AppState::new(relay, config)));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/")
}

async fn next_envelope<S>(stream: &mut S) -> pmu_protocol::Envelope
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for an envelope")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = message {
            let Frame::Data(envelope) = codec::decode(&text).unwrap();
            return envelope;
        }
    }
}

async fn wait_for_sessions(relay: &Relay, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while relay.session_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_late_joiner_receives_current_state_first() {
    let relay = Arc::new(Relay::new());
    let url = serve(Arc::clone(&relay)).await;

    relay.ingest(
        Source::Grid,
        PmuSample::nominal(1, 1.0).with_voltage(pmu_protocol::Phase::A, 220.0, 0.0),
    );
    relay.ingest(
        Source::Microgrid,
        PmuSample::nominal(2, 1.0).with_voltage(pmu_protocol::Phase::A, 219.0, 5.0),
    );

    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    let first = next_envelope(&mut ws).await;
    assert!(first.is_sync());
    assert_eq!(first.grid.as_ref().unwrap().va_mag, 220.0);
    assert_eq!(first.microgrid.as_ref().unwrap().va_mag, 219.0);
    assert_eq!(first.microgrid.as_ref().unwrap().va_ang, 5.0);

    relay.ingest(Source::Grid, PmuSample::nominal(1, 2.0));
    let second = next_envelope(&mut ws).await;
    assert_eq!(second.topic, Some(Source::Grid));
    assert_eq!(second.data.as_ref().unwrap().timestamp, 2.0);
    assert_eq!(second.microgrid.as_ref().unwrap().va_mag, 219.0);
}

#[tokio::test]
async fn test_all_clients_receive_each_sample() {
    let relay = Arc::new(Relay::new());
    let url = serve(Arc::clone(&relay)).await;

    let (mut a, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    let (mut b, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    wait_for_sessions(&relay, 2).await;

    relay.ingest(Source::Microgrid, PmuSample::nominal(2, 10.0));
    for ws in [&mut a, &mut b] {
        let envelope = next_envelope(ws).await;
        assert_eq!(envelope.topic, Some(Source::Microgrid));
        assert!(envelope.grid.is_none());
    }
}

#[tokio::test]
async fn test_closed_client_is_removed() {
    let relay = Arc::new(Relay::new());
    let url = serve(Arc::clone(&relay)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    wait_for_sessions(&relay, 1).await;
    ws.close(None).await.unwrap();
    wait_for_sessions(&relay, 0).await;
}

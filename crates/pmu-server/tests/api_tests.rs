//! HTTP endpoint tests.
//!
//! Drive the axum router directly through `tower::ServiceExt`, no socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pmu_core::Relay;
use pmu_protocol::{PmuSample, Source};
use pmu_relay::{build_router, AppState, Config};
use serde_json::Value;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    let config: Config = toml::from_str("").unwrap();
    Arc::new(AppState::new(Arc::new(Relay::new()), config))
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_with_empty_store() {
    let (status, json) = get_json(test_state(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["connections"], 0);
    assert_eq!(json["latestData"]["gridPMU"], "no data");
    assert_eq!(json["latestData"]["microgridPMU"], "no data");
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_health_reports_available_sources() {
    let state = test_state();
    state.relay.ingest(Source::Microgrid, PmuSample::nominal(2, 1.0));

    let (_, json) = get_json(state, "/health").await;
    assert_eq!(json["latestData"]["gridPMU"], "no data");
    assert_eq!(json["latestData"]["microgridPMU"], "available");
}

#[tokio::test]
async fn test_latest_returns_current_pair() {
    let state = test_state();
    let (status, json) = get_json(Arc::clone(&state), "/api/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["gridPMU"].is_null());
    assert!(json["microgridPMU"].is_null());

    let mut sample = PmuSample::nominal(1, 1_700_000_000.5);
    sample.va_ang = 12.5;
    state.relay.ingest(Source::Grid, sample);

    let (_, json) = get_json(state, "/api/latest").await;
    assert_eq!(json["gridPMU"]["pmu_id"], 1);
    assert_eq!(json["gridPMU"]["time"], 1_700_000_000.5);
    assert_eq!(json["gridPMU"]["va_ang"], 12.5);
    assert!(json["microgridPMU"].is_null());
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let response = build_router(test_state())
        .oneshot(
            Request::get("/api/latest")
                .header(header::ORIGIN, "http://dashboard.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = build_router(test_state())
        .oneshot(Request::get("/api/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

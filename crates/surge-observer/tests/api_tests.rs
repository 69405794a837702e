//! Integration tests for the market API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::{Value, json};
use surge_core::config::DynamicsConfig;
use surge_core::{EngineConfig, MarketEngine};
use surge_observer::router::build_router;
use surge_observer::state::AppState;
use tower::ServiceExt;

fn test_config() -> EngineConfig {
    EngineConfig {
        dynamics: DynamicsConfig {
            seed: Some(1),
            utc_offset_minutes: Some(0),
            ..DynamicsConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn make_test_state() -> Arc<AppState> {
    let engine = Arc::new(MarketEngine::new(&test_config()));
    engine.initialize(Utc::now());
    Arc::new(AppState::new(engine))
}

fn make_uninitialized_state() -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(MarketEngine::new(&test_config()))))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn times_square_trip() -> Value {
    json!({
        "pickup_lat": 40.7589,
        "pickup_lng": -73.9851,
        "dropoff_lat": 40.7484,
        "dropoff_lng": -73.9857,
        "ride_type": "economy"
    })
}

// =========================================================================
// Health
// =========================================================================

#[tokio::test]
async fn test_health() {
    let app = build_router(make_test_state());
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["market_ready"], true);
    assert_eq!(json["sequence"], 1);
}

// =========================================================================
// Pricing
// =========================================================================

#[tokio::test]
async fn test_predict_price() {
    let app = build_router(make_test_state());
    let response = app
        .oneshot(post_json("/predict-price", &times_square_trip()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ride_class"], "economy");
    let distance = json["distance_km"].as_f64().unwrap();
    assert!((distance - 1.17).abs() < 0.02);
    let eta = json["eta_minutes"].as_u64().unwrap();
    assert!((2..=3).contains(&eta));
    assert!(json["total_price"].as_f64().unwrap() >= 5.0);
    assert!(json["breakdown"]["surge_adjustment"].is_number());
}

#[tokio::test]
async fn test_predict_price_accepts_lon_alias_and_default_class() {
    let app = build_router(make_test_state());
    let body = json!({
        "pickup_lat": 40.7589,
        "pickup_lon": -73.9851,
        "dropoff_lat": 40.7074,
        "dropoff_lon": -74.0113
    });
    let response = app.oneshot(post_json("/predict-price", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ride_class"], "economy");
}

#[tokio::test]
async fn test_predict_price_invalid_latitude() {
    let app = build_router(make_test_state());
    let mut body = times_square_trip();
    body["pickup_lat"] = json!(95.0);
    let response = app.oneshot(post_json("/predict-price", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("pickup_lat"));
}

#[tokio::test]
async fn test_predict_price_before_first_snapshot() {
    let app = build_router(make_uninitialized_state());
    let response = app
        .oneshot(post_json("/predict-price", &times_square_trip()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 503);
}

#[tokio::test]
async fn test_luxury_costs_more_than_economy() {
    let state = make_test_state();
    let mut luxury = times_square_trip();
    luxury["dropoff_lat"] = json!(40.65);
    luxury["ride_type"] = json!("luxury");
    let mut economy = luxury.clone();
    economy["ride_type"] = json!("economy");

    let lux = build_router(Arc::clone(&state))
        .oneshot(post_json("/predict-price", &luxury))
        .await
        .unwrap();
    let eco = build_router(state)
        .oneshot(post_json("/predict-price", &economy))
        .await
        .unwrap();

    let lux = body_to_json(lux.into_body()).await;
    let eco = body_to_json(eco.into_body()).await;
    assert!(lux["total_price"].as_f64().unwrap() > eco["total_price"].as_f64().unwrap());
}

// =========================================================================
// Market
// =========================================================================

#[tokio::test]
async fn test_market_status() {
    let app = build_router(make_test_state());
    let response = app.oneshot(get("/api/market-status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["weather"], "clear");
    assert_eq!(json["sequence"], 1);
    assert!((json["surge_multiplier"].as_f64().unwrap() - 1.2).abs() < 1e-9);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_market_status_before_first_snapshot() {
    let app = build_router(make_uninitialized_state());
    let response = app.oneshot(get("/api/market-status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_update_demand_clamps() {
    let state = make_test_state();
    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/update-demand", &json!({ "demand": 10.0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ok"], true);
    assert!((json["value"].as_f64().unwrap() - 2.0).abs() < f64::EPSILON);

    let status = state.engine.status().unwrap();
    assert!((status.demand - 2.0).abs() < f64::EPSILON);
    assert_eq!(status.sequence, 2);
}

#[tokio::test]
async fn test_update_supply_clamps() {
    let state = make_test_state();
    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/update-supply", &json!({ "supply": 0.0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["field"], "supply");
    assert!((json["value"].as_f64().unwrap() - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_update_demand_rejects_missing_field() {
    let app = build_router(make_test_state());
    let response = app
        .oneshot(post_json("/api/update-demand", &json!({ "level": 1.0 })))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_market_history() {
    let state = make_test_state();
    state.engine.override_demand(1.5).unwrap();
    state.engine.override_supply(0.8).unwrap();

    let response = build_router(state)
        .oneshot(get("/api/market-history?limit=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.first().unwrap()["sequence"], 2);
    assert_eq!(entries.last().unwrap()["sequence"], 3);
}

#[tokio::test]
async fn test_demand_forecast_default_hours() {
    let app = build_router(make_test_state());
    let response = app.oneshot(get("/api/demand-forecast")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let points = json.as_array().unwrap();
    assert_eq!(points.len(), 6);
    assert_eq!(points.first().unwrap()["confidence"], 0.95);
}

#[tokio::test]
async fn test_demand_forecast_rejects_out_of_range_hours() {
    let app = build_router(make_test_state());
    let response = app
        .oneshot(get("/api/demand-forecast?hours=48"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_surge_zones() {
    let app = build_router(make_test_state());
    let response = app.oneshot(get("/api/surge-zones")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let zones = json.as_array().unwrap();
    assert_eq!(zones.len(), 8);
    assert!(zones.iter().any(|z| z["name"] == "Financial District"));
    for zone in zones {
        let surge = zone["surge_multiplier"].as_f64().unwrap();
        assert!((1.0..=3.0).contains(&surge));
        assert!(zone["band"].is_string());
    }
}

#[tokio::test]
async fn test_events() {
    let mut config = test_config();
    config.events.probability = 1.0;
    let engine = Arc::new(MarketEngine::new(&config));
    let app = build_router(Arc::new(AppState::new(engine)));

    let response = app.oneshot(get("/api/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let events = json.as_array().unwrap();
    assert_eq!(events.len(), 1);
    let event = events.first().unwrap();
    assert!(event["type"].is_string());
    assert!(event["impact_multiplier"].as_f64().unwrap() > 1.0);
    let zones = event["affected_zones"].as_array().unwrap();
    assert!((1..=3).contains(&zones.len()));
}

// =========================================================================
// Operator
// =========================================================================

#[tokio::test]
async fn test_operator_pause_resume_status() {
    let state = make_test_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(Request::post("/api/operator/pause").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.engine.control().is_paused());

    let response = build_router(Arc::clone(&state))
        .oneshot(get("/api/operator/status"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["paused"], true);
    assert_eq!(json["ticks"], 0);
    assert_eq!(json["sequence"], 1);

    let response = build_router(Arc::clone(&state))
        .oneshot(Request::post("/api/operator/resume").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.engine.control().is_paused());
}

#[tokio::test]
async fn test_operator_speed() {
    let state = make_test_state();
    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            "/api/operator/speed",
            &json!({ "tick_interval_ms": 1000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["previous_interval_ms"], 5000);
    assert_eq!(state.engine.control().tick_interval_ms(), 1000);

    let response = build_router(state)
        .oneshot(post_json("/api/operator/speed", &json!({ "tick_interval_ms": 5 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_operator_stop() {
    let state = make_test_state();
    let response = build_router(Arc::clone(&state))
        .oneshot(Request::post("/api/operator/stop").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.engine.control().is_stop_requested());
}

// =========================================================================
// Update stream
// =========================================================================

#[tokio::test]
async fn test_subscription_receives_tick_update() {
    let config = test_config();
    let state = make_test_state();
    let handle = state.engine.subscribe();
    let mut simulator = surge_core::DynamicsSimulator::new(
        &config.dynamics,
        surge_core::MarketBounds::from_config(&config.market),
    )
    .unwrap();

    state.engine.tick(&mut simulator, Utc::now()).unwrap();

    let payload = handle.recv().await.unwrap();
    let json: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(json["type"], "market_update");
    assert_eq!(json["sequence"], 2);
}

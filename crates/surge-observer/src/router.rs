//! Axum router construction for the API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `POST /predict-price` -- trip quote
/// - `GET /ws` -- `WebSocket` market update stream
/// - `GET /api/market-status` -- current snapshot
/// - `POST /api/update-demand`, `POST /api/update-supply` -- overrides
/// - `GET /api/market-history` -- recent snapshots
/// - `GET /api/demand-forecast` -- demand forecast
/// - `GET /api/surge-zones` -- per-zone surge
/// - `GET /api/events` -- active city events
/// - `/api/operator/*` -- tick loop control
///
/// CORS allows any origin so a browser dashboard can connect directly.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Pricing
        .route("/predict-price", post(handlers::predict_price))
        // WebSocket
        .route("/ws", get(ws::ws_market))
        // Market API
        .route("/api/market-status", get(handlers::market_status))
        .route("/api/update-demand", post(handlers::update_demand))
        .route("/api/update-supply", post(handlers::update_supply))
        .route("/api/market-history", get(handlers::market_history))
        .route("/api/demand-forecast", get(handlers::demand_forecast))
        .route("/api/surge-zones", get(handlers::surge_zones))
        .route("/api/events", get(handlers::market_events))
        // Operator API
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/stop", post(operator::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

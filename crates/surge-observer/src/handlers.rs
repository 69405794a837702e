//! REST API endpoint handlers for the market.
//!
//! All handlers go through the shared [`MarketEngine`](surge_core::MarketEngine)
//! in [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `POST` | `/predict-price` | Price a trip against the live market |
//! | `GET` | `/api/market-status` | Current market snapshot |
//! | `POST` | `/api/update-demand` | Override the demand level |
//! | `POST` | `/api/update-supply` | Override the supply level |
//! | `GET` | `/api/market-history` | Recent snapshots, oldest first |
//! | `GET` | `/api/demand-forecast` | Pattern-based demand forecast |
//! | `GET` | `/api/surge-zones` | Per-neighbourhood surge view |
//! | `GET` | `/api/events` | Active city events |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::Utc;
use surge_core::forecast::DEFAULT_FORECAST_HOURS;
use surge_types::{
    ForecastPoint, MarketEvent, MarketStatus, PriceQuote, PriceRequest, SurgeZone,
};

use crate::error::ObserverError;
use crate::state::AppState;

/// Snapshots returned by `GET /api/market-history` when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 60;

// ---------------------------------------------------------------------------
// Request / query types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/update-demand`.
#[derive(Debug, serde::Deserialize)]
pub struct DemandUpdate {
    /// Requested demand level. Clamped to the configured range.
    pub demand: f64,
}

/// Request body for `POST /api/update-supply`.
#[derive(Debug, serde::Deserialize)]
pub struct SupplyUpdate {
    /// Requested supply level. Clamped to the configured range.
    pub supply: f64,
}

/// Query parameters for `GET /api/market-history`.
#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of snapshots to return (default 60).
    pub limit: Option<usize>,
}

/// Query parameters for `GET /api/demand-forecast`.
#[derive(Debug, serde::Deserialize)]
pub struct ForecastQuery {
    /// Forecast horizon in hours, 1-24 (default 6).
    pub hours: Option<u32>,
}

/// Response body for the level override endpoints.
#[derive(Debug, serde::Serialize)]
struct LevelResponse {
    ok: bool,
    field: &'static str,
    value: f64,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe. Reports whether the market has been initialized.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sequence = state.engine.store().read().ok().map(|s| s.sequence);
    Json(serde_json::json!({
        "status": "healthy",
        "market_ready": sequence.is_some(),
        "sequence": sequence,
        "timestamp": Utc::now(),
    }))
}

// ---------------------------------------------------------------------------
// POST /predict-price
// ---------------------------------------------------------------------------

/// Price a trip against the current market snapshot.
///
/// Returns 400 for invalid coordinates and 503 before the market has its
/// first snapshot.
pub async fn predict_price(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PriceRequest>,
) -> Result<Json<PriceQuote>, ObserverError> {
    Ok(Json(state.engine.quote(&request)?))
}

// ---------------------------------------------------------------------------
// GET /api/market-status
// ---------------------------------------------------------------------------

/// Current market snapshot with the derived surge multiplier.
pub async fn market_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MarketStatus>, ObserverError> {
    Ok(Json(state.engine.status()?))
}

// ---------------------------------------------------------------------------
// POST /api/update-demand, POST /api/update-supply
// ---------------------------------------------------------------------------

/// Override the demand level. Responds with the clamped value stored.
pub async fn update_demand(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DemandUpdate>,
) -> Result<impl IntoResponse, ObserverError> {
    let value = state.engine.override_demand(body.demand)?;
    Ok(Json(LevelResponse {
        ok: true,
        field: "demand",
        value,
    }))
}

/// Override the supply level. Responds with the clamped value stored.
pub async fn update_supply(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SupplyUpdate>,
) -> Result<impl IntoResponse, ObserverError> {
    let value = state.engine.override_supply(body.supply)?;
    Ok(Json(LevelResponse {
        ok: true,
        field: "supply",
        value,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/market-history
// ---------------------------------------------------------------------------

/// Recent market snapshots, oldest first.
pub async fn market_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<MarketStatus>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.engine.history(limit))
}

// ---------------------------------------------------------------------------
// GET /api/demand-forecast
// ---------------------------------------------------------------------------

/// Demand forecast for the coming hours.
///
/// Returns 400 if `hours` is outside `1..=24`.
pub async fn demand_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<Vec<ForecastPoint>>, ObserverError> {
    let hours = query.hours.unwrap_or(DEFAULT_FORECAST_HOURS);
    if !(1..=surge_core::forecast::MAX_FORECAST_HOURS).contains(&hours) {
        return Err(ObserverError::InvalidQuery(format!(
            "hours must be between 1 and {}",
            surge_core::forecast::MAX_FORECAST_HOURS
        )));
    }
    Ok(Json(state.engine.forecast(Utc::now(), hours)))
}

// ---------------------------------------------------------------------------
// GET /api/surge-zones
// ---------------------------------------------------------------------------

/// Per-neighbourhood surge around the current global surge.
pub async fn surge_zones(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SurgeZone>>, ObserverError> {
    Ok(Json(state.engine.surge_zones(Utc::now())?))
}

// ---------------------------------------------------------------------------
// GET /api/events
// ---------------------------------------------------------------------------

/// City events currently raising demand. Usually empty.
pub async fn market_events(State(state): State<Arc<AppState>>) -> Json<Vec<MarketEvent>> {
    Json(state.engine.events())
}

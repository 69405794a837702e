//! Operator REST API handlers for runtime control of the tick loop.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/operator/status` | Tick counters, subscribers, drops |
//! | `POST` | `/api/operator/pause` | Pause the tick loop |
//! | `POST` | `/api/operator/resume` | Resume the tick loop |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `POST` | `/api/operator/stop` | Stop the tick loop and shut down |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use surge_core::EngineStatus;
use surge_core::config::MIN_TICK_INTERVAL_MS;
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds.
    pub tick_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

/// Current runtime status of the engine.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<EngineStatus> {
    Json(state.engine.engine_status())
}

/// Pause the tick loop. Reads and quotes keep working on the last snapshot.
pub async fn pause(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.engine.control().pause();
    info!("Operator paused the market loop");
    Json(OperatorResponse {
        ok: true,
        message: "Market loop paused".to_owned(),
    })
}

/// Resume the tick loop after a pause.
pub async fn resume(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.engine.control().resume();
    info!("Operator resumed the market loop");
    Json(OperatorResponse {
        ok: true,
        message: "Market loop resumed".to_owned(),
    })
}

/// Change the tick interval at runtime. Takes effect before the next sleep.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    state
        .engine
        .control()
        .set_tick_interval_ms(body.tick_interval_ms)
        .map_or_else(
            || {
                Err(ObserverError::InvalidQuery(format!(
                    "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
                )))
            },
            |prev| {
                info!(
                    previous_ms = prev,
                    new_ms = body.tick_interval_ms,
                    "Operator changed tick interval"
                );
                Ok(Json(serde_json::json!({
                    "ok": true,
                    "previous_interval_ms": prev,
                    "new_interval_ms": body.tick_interval_ms,
                })))
            },
        )
}

/// Request a clean stop. The current tick completes, then the loop exits
/// and the server shuts down.
pub async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.engine.control().request_stop();
    info!("Operator requested stop");
    Json(OperatorResponse {
        ok: true,
        message: "Stop requested".to_owned(),
    })
}

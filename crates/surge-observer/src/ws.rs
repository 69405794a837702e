//! `WebSocket` handler for real-time market updates.
//!
//! Clients connect to `GET /ws`, immediately receive the current snapshot,
//! then one JSON-encoded [`MarketUpdate`] per tick. Each connection owns a
//! subscription on the engine's broadcast hub and a sender task that drains
//! it. If the client falls behind, the hub drops its oldest pending
//! updates; the client resumes from the newest ones.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use surge_types::MarketUpdate;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming market updates.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_market(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: subscribe, forward queued updates as
/// text frames, and unsubscribe once either side goes away.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let handle = Arc::new(state.engine.subscribe());
    let id = handle.id();
    debug!(subscriber = %id, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();

    // Current snapshot first, so the client does not wait a full tick.
    if let Ok(status) = state.engine.status() {
        match serde_json::to_string(&MarketUpdate::from(status)) {
            Ok(json) => {
                if sink.send(Message::Text(json.into())).await.is_err() {
                    debug!(subscriber = %id, "WebSocket client disconnected (send failed)");
                    state.engine.hub().unsubscribe(id);
                    return;
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize initial market update"),
        }
    }

    let outbound = Arc::clone(&handle);
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if sink.send(Message::Text(payload.as_ref().into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!(error = %e, "WebSocket error");
                    break;
                }
                // Client text, binary, and ping frames are ignored.
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.engine.hub().unsubscribe(id);
    debug!(subscriber = %id, "WebSocket client disconnected");
}

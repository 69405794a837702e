//! HTTP and `WebSocket` API for the Surge pricing engine.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Pricing** (`POST /predict-price`) backed by the live market snapshot
//! - **Market REST endpoints** for status, history, forecast, surge zones,
//!   and demand/supply overrides
//! - **`WebSocket` endpoint** (`/ws`) streaming one market update per tick
//! - **Operator REST endpoints** for pause, resume, speed, status, and stop
//!
//! # Architecture
//!
//! Every handler goes through the shared [`MarketEngine`]. Reads clone the
//! current snapshot pointer and never block the tick loop. Each `WebSocket`
//! connection owns one subscription on the engine's broadcast hub and a
//! sender task draining it, so a slow client only ever loses its own
//! oldest updates.
//!
//! [`MarketEngine`]: surge_core::MarketEngine

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;

//! Core market-state engine for the Surge pricing service.
//!
//! This crate holds everything that runs without a network:
//!
//! - [`store`]: the authoritative copy-on-write market snapshot
//! - [`dynamics`]: the stochastic per-tick market simulator
//! - [`pricing`] and [`surge`]: trip quotes and the surge multiplier
//! - [`broadcast`]: bounded per-subscriber fan-out of market updates
//! - [`engine`]: the facade the HTTP layer and the tick runner share
//! - [`runner`] and [`control`]: the tick loop and its operator controls

pub mod broadcast;
pub mod config;
pub mod control;
pub mod dynamics;
pub mod engine;
pub mod error;
pub mod events;
pub mod forecast;
pub mod geo;
pub mod history;
pub mod patterns;
pub mod pricing;
pub mod runner;
pub mod store;
pub mod surge;
pub mod zones;

pub use broadcast::{BroadcastError, BroadcastHub, SubscriberHandle, SubscriberId};
pub use config::{ConfigError, EngineConfig};
pub use control::EngineControl;
pub use dynamics::{DynamicsSimulator, TickError};
pub use engine::{EngineStatus, MarketEngine};
pub use error::MarketError;
pub use runner::{NoOpCallback, RunSummary, TickCallback, run_market_loop};
pub use store::{MarketBounds, MarketStore};

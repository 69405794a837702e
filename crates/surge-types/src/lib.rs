//! Shared type definitions for the Surge pricing engine.
//!
//! This crate is the single source of truth for the value types that flow
//! between the market engine, the HTTP/WebSocket layer, and any dashboard
//! client. Wire types are exported to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`enums`] -- Weather conditions, ride classes, surge bands, event kinds
//! - [`market`] -- Market snapshots and the status/update projections
//! - [`quote`] -- Price requests and itemized price quotes
//! - [`insights`] -- Demand forecast points, surge zones, and city events

pub mod enums;
pub mod insights;
pub mod market;
pub mod quote;

// Re-export all public types at crate root for convenience.
pub use enums::{Borough, EventKind, RideClass, SurgeBand, UpdateKind, Weather};
pub use insights::{ForecastPoint, MarketEvent, SurgeZone};
pub use market::{MarketState, MarketStatus, MarketUpdate};
pub use quote::{CostBreakdown, PriceQuote, PriceRequest};

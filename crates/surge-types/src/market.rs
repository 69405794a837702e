//! Market snapshot types.
//!
//! [`MarketState`] is the immutable snapshot held by the market store.
//! [`MarketStatus`] is its public projection (with the derived surge
//! multiplier attached), and [`MarketUpdate`] is the same projection
//! tagged for the update stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{UpdateKind, Weather};

/// Supply, demand, weather, and traffic conditions at one instant.
///
/// Values are produced by the dynamics simulator (or the override path)
/// already clamped; a snapshot is never modified after construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketState {
    /// Relative rider demand level.
    pub demand: f64,
    /// Relative driver supply level.
    pub supply: f64,
    /// Current weather condition.
    pub weather: Weather,
    /// Traffic slowdown factor (1.0 = free flow).
    pub traffic_factor: f64,
    /// Wall-clock instant the snapshot was produced.
    pub timestamp: DateTime<Utc>,
    /// Commit sequence number assigned by the store.
    pub sequence: u64,
}

impl MarketState {
    /// Build a snapshot with sequence number 0. The store stamps the real
    /// sequence number on commit.
    pub const fn new(
        demand: f64,
        supply: f64,
        weather: Weather,
        traffic_factor: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            demand,
            supply,
            weather,
            traffic_factor,
            timestamp,
            sequence: 0,
        }
    }

    /// Ratio of demand to supply. Supply is never zero for a clamped state.
    pub fn demand_supply_ratio(&self) -> f64 {
        self.demand / self.supply
    }
}

/// Public view of the current market, as served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketStatus {
    /// Relative rider demand level (2 dp).
    pub demand: f64,
    /// Relative driver supply level (2 dp).
    pub supply: f64,
    /// Current weather condition.
    pub weather: Weather,
    /// Price multiplier applied for the current weather.
    pub weather_multiplier: f64,
    /// Traffic slowdown factor (2 dp).
    pub traffic_factor: f64,
    /// Surge multiplier derived from the snapshot (2 dp).
    pub surge_multiplier: f64,
    /// Demand divided by supply (3 dp).
    pub demand_supply_ratio: f64,
    /// Instant the underlying snapshot was produced.
    pub timestamp: DateTime<Utc>,
    /// Commit sequence number of the underlying snapshot.
    pub sequence: u64,
}

/// One streamed message per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketUpdate {
    /// Message discriminator, always `market_update`.
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    /// The status fields, flattened into the message.
    #[serde(flatten)]
    pub status: MarketStatus,
}

impl From<MarketStatus> for MarketUpdate {
    fn from(status: MarketStatus) -> Self {
        Self {
            kind: UpdateKind::MarketUpdate,
            status,
        }
    }
}

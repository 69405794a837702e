//! Forecast and zone views derived from the market patterns.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Borough, EventKind, SurgeBand};

/// Expected demand for one upcoming hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ForecastPoint {
    /// Local wall-clock time of the forecast slot, `HH:MM`.
    pub time: String,
    /// Local hour of day (0-23).
    pub hour: u32,
    /// Expected demand level from the time patterns.
    pub demand_level: f64,
    /// Expected surge multiplier (1 dp).
    pub expected_surge: f64,
    /// Confidence in `[0.75, 0.95]`, decreasing with lead time.
    pub confidence: f64,
}

/// Surge view of one neighbourhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SurgeZone {
    /// Neighbourhood name.
    pub name: String,
    /// Zone centre as `[lat, lng]`.
    pub center: [f64; 2],
    /// Zone surge multiplier (1 dp).
    pub surge_multiplier: f64,
    /// Coarse band for overlays.
    pub band: SurgeBand,
}

/// An active city event raising demand in some boroughs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketEvent {
    /// What kind of event it is.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// One-line description for dashboards.
    pub description: String,
    /// Demand multiplier the event applies in its boroughs.
    pub impact_multiplier: f64,
    /// Expected remaining duration in minutes.
    pub estimated_duration: u32,
    /// Boroughs affected (1 to 3, no repeats).
    pub affected_zones: Vec<Borough>,
}

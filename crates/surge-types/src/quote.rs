//! Price request and quote types.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::RideClass;

/// A pricing request as submitted by a rider-facing client.
///
/// Coordinates are validated by the pricing engine, not here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PriceRequest {
    /// Pickup latitude in degrees.
    pub pickup_lat: f64,
    /// Pickup longitude in degrees.
    #[serde(alias = "pickup_lon")]
    pub pickup_lng: f64,
    /// Dropoff latitude in degrees.
    pub dropoff_lat: f64,
    /// Dropoff longitude in degrees.
    #[serde(alias = "dropoff_lon")]
    pub dropoff_lng: f64,
    /// Requested ride class (defaults to economy).
    #[serde(default, alias = "ride_class")]
    pub ride_type: RideClass,
}

/// Itemized components of the base price plus the dynamic adjustment.
///
/// `base_fare + distance_cost + time_cost + surge_adjustment` equals the
/// quote's total price up to rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CostBreakdown {
    /// Flat fare for the ride class.
    pub base_fare: f64,
    /// Distance component of the base price.
    pub distance_cost: f64,
    /// Time component of the base price.
    pub time_cost: f64,
    /// Everything surge, weather, traffic, and the minimum fare add on top.
    pub surge_adjustment: f64,
}

/// Itemized price quote for one trip. Created per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PriceQuote {
    /// Ride class the quote was computed for.
    pub ride_class: RideClass,
    /// Base fare plus distance and time components.
    pub base_price: f64,
    /// Demand/supply surge multiplier in `[1.0, 3.0]`.
    pub surge_multiplier: f64,
    /// Weather multiplier.
    pub weather_multiplier: f64,
    /// Normalized traffic multiplier.
    pub traffic_multiplier: f64,
    /// Final price charged to the rider.
    pub total_price: f64,
    /// Great-circle trip distance in kilometres.
    pub distance_km: f64,
    /// Estimated trip duration in whole minutes (at least 1).
    pub eta_minutes: u32,
    /// Cost breakdown.
    pub breakdown: CostBreakdown,
}

//! Trip pricing.
//!
//! [`PricingEngine`] turns trip geometry, a ride class, and one market
//! snapshot into an itemized [`PriceQuote`]. It holds no mutable state, so a
//! single instance is shared by every request.

use surge_types::{CostBreakdown, MarketState, PriceQuote, PriceRequest, RideClass};

use crate::config::PricingConfig;
use crate::error::MarketError;
use crate::geo::{self, GeoPoint};
use crate::surge::{round_dp, surge_for};

/// Validated pickup and dropoff of a trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trip {
    /// Pickup point.
    pub pickup: GeoPoint,
    /// Dropoff point.
    pub dropoff: GeoPoint,
    /// Requested ride class.
    pub ride_class: RideClass,
}

impl Trip {
    /// Validate the coordinates of a request.
    pub fn from_request(request: &PriceRequest) -> Result<Self, MarketError> {
        Ok(Self {
            pickup: GeoPoint::new(
                request.pickup_lat,
                request.pickup_lng,
                "pickup_lat",
                "pickup_lng",
            )?,
            dropoff: GeoPoint::new(
                request.dropoff_lat,
                request.dropoff_lng,
                "dropoff_lat",
                "dropoff_lng",
            )?,
            ride_class: request.ride_type,
        })
    }
}

/// Computes price quotes from tariffs and a market snapshot.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    /// Build a pricing engine.
    pub const fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// The pricing configuration in use.
    pub const fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Validate a request and price it against `snapshot`.
    pub fn quote(
        &self,
        request: &PriceRequest,
        snapshot: &MarketState,
    ) -> Result<PriceQuote, MarketError> {
        let trip = Trip::from_request(request)?;
        Ok(self.price_trip(&trip, snapshot))
    }

    /// Price an already validated trip.
    ///
    /// `total_price = max(minimum_fare, base_price * surge * weather * traffic)`
    /// where `base_price` is the class base fare plus distance and time
    /// components. Every monetary field is rounded to 2 decimals.
    pub fn price_trip(&self, trip: &Trip, snapshot: &MarketState) -> PriceQuote {
        let distance_km = geo::haversine_km(trip.pickup, trip.dropoff);
        let eta_minutes = geo::eta_minutes(
            distance_km,
            snapshot.traffic_factor,
            self.config.base_speed_kmh,
        );

        let tariff = self.config.tariffs.for_class(trip.ride_class);
        let distance_cost = distance_km * tariff.per_km;
        let time_cost = f64::from(eta_minutes) * self.config.per_minute_rate;
        let base_price = tariff.base_fare + distance_cost + time_cost;

        let surge = surge_for(snapshot, &self.config.weather_impacts);
        let weather_multiplier = self.config.weather_impacts.impact(snapshot.weather);
        let traffic_multiplier = traffic_multiplier(snapshot.traffic_factor);

        let total = (base_price * surge * weather_multiplier * traffic_multiplier)
            .max(self.config.minimum_fare);

        let base_price = round_dp(base_price, 2);
        let total_price = round_dp(total, 2);

        PriceQuote {
            ride_class: trip.ride_class,
            base_price,
            surge_multiplier: round_dp(surge, 2),
            weather_multiplier: round_dp(weather_multiplier, 2),
            traffic_multiplier: round_dp(traffic_multiplier, 2),
            total_price,
            distance_km: round_dp(distance_km, 2),
            eta_minutes,
            breakdown: CostBreakdown {
                base_fare: round_dp(tariff.base_fare, 2),
                distance_cost: round_dp(distance_cost, 2),
                time_cost: round_dp(time_cost, 2),
                surge_adjustment: round_dp(total_price - base_price, 2),
            },
        }
    }
}

/// Normalized traffic multiplier: 1.0 at free flow, 1.15 at the 2.5 cap.
pub fn traffic_multiplier(traffic_factor: f64) -> f64 {
    0.1f64.mul_add(traffic_factor, 0.9)
}

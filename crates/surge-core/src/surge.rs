//! The surge multiplier.
//!
//! Surge is a pure function of the demand/supply ratio, the weather impact,
//! and the traffic factor. It is recomputed from the snapshot whenever it is
//! needed and never stored.

use surge_types::MarketState;

use crate::config::WeatherImpacts;

/// Lower bound of every surge multiplier.
pub const SURGE_MIN: f64 = 1.0;

/// Upper bound of every surge multiplier.
pub const SURGE_MAX: f64 = 3.0;

/// Weather impact above which surge gets the weather bump.
const WEATHER_BUMP_THRESHOLD: f64 = 1.2;

/// Traffic factor above which surge gets the congestion bump.
const TRAFFIC_BUMP_THRESHOLD: f64 = 1.4;

/// Piecewise surge from demand/supply plus weather and traffic bumps.
///
/// The ratio bands are cumulative, so the result is continuous and
/// non-decreasing in `demand / supply`:
///
/// | ratio        | slope |
/// |--------------|-------|
/// | up to 0.6    | 0     |
/// | 0.6 to 0.8   | 0.25  |
/// | 0.8 to 1.0   | 0.75  |
/// | above 1.0    | 0.8   |
///
/// Non-positive supply counts as an unbounded ratio. A NaN ratio yields
/// [`SURGE_MIN`].
pub fn surge_multiplier(demand: f64, supply: f64, weather_impact: f64, traffic_factor: f64) -> f64 {
    let ratio = if supply > 0.0 {
        demand / supply
    } else {
        f64::INFINITY
    };
    if ratio.is_nan() {
        return SURGE_MIN;
    }

    let mut surge = 1.0;
    if ratio > 0.6 {
        surge += (ratio.min(1.0) - 0.6) * 0.25;
    }
    if ratio > 0.8 {
        surge += (ratio.min(1.0) - 0.8) * 0.5;
    }
    if ratio > 1.0 {
        surge += (ratio - 1.0) * 0.8;
    }

    if weather_impact > WEATHER_BUMP_THRESHOLD {
        surge *= 1.1;
    }
    if traffic_factor > TRAFFIC_BUMP_THRESHOLD {
        surge *= 1.05;
    }
    surge.clamp(SURGE_MIN, SURGE_MAX)
}

/// Surge for a committed snapshot.
pub fn surge_for(state: &MarketState, impacts: &WeatherImpacts) -> f64 {
    surge_multiplier(
        state.demand,
        state.supply,
        impacts.impact(state.weather),
        state.traffic_factor,
    )
}

/// Round to a fixed number of decimal places.
pub fn round_dp(value: f64, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (value * scale).round() / scale
}

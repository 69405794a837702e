//! Pattern-driven demand forecast for the coming hours.

use chrono::{DateTime, TimeDelta, Utc};
use surge_types::ForecastPoint;

use crate::patterns::{MarketPatterns, TimeSlot, local_time};
use crate::store::MarketBounds;
use crate::surge::{SURGE_MIN, round_dp};

/// Longest forecast horizon in hours.
pub const MAX_FORECAST_HOURS: u32 = 24;

/// Forecast horizon used when the caller does not ask for one.
pub const DEFAULT_FORECAST_HOURS: u32 = 6;

const BASE_CONFIDENCE: f64 = 0.95;
const CONFIDENCE_DECAY_PER_HOUR: f64 = 0.03;
const MIN_CONFIDENCE: f64 = 0.75;

/// Expected demand derived from the time patterns alone (no noise).
#[derive(Debug, Clone)]
pub struct DemandForecaster {
    patterns: MarketPatterns,
    bounds: MarketBounds,
    utc_offset_minutes: Option<i32>,
}

impl DemandForecaster {
    /// Build a forecaster over the same patterns the simulator uses.
    pub fn new(
        patterns: &MarketPatterns,
        bounds: MarketBounds,
        utc_offset_minutes: Option<i32>,
    ) -> Self {
        Self {
            patterns: patterns.clone(),
            bounds,
            utc_offset_minutes,
        }
    }

    /// One point per hour starting at `now`, `hours` clamped to
    /// `1..=MAX_FORECAST_HOURS`.
    pub fn forecast(&self, now: DateTime<Utc>, hours: u32) -> Vec<ForecastPoint> {
        (0..hours.clamp(1, MAX_FORECAST_HOURS))
            .map(|i| {
                let at = now
                    .checked_add_signed(TimeDelta::hours(i64::from(i)))
                    .unwrap_or(now);
                let local = local_time(at, self.utc_offset_minutes);
                let slot = TimeSlot::of(&local);
                let multiplier = self.patterns.demand(slot);
                let confidence = CONFIDENCE_DECAY_PER_HOUR
                    .mul_add(-f64::from(i), BASE_CONFIDENCE)
                    .max(MIN_CONFIDENCE);
                ForecastPoint {
                    time: local.format("%H:%M").to_string(),
                    hour: slot.hour,
                    demand_level: round_dp(self.bounds.clamp_level(multiplier), 2),
                    expected_surge: round_dp((multiplier * 0.8).max(SURGE_MIN), 1),
                    confidence: round_dp(confidence, 2),
                }
            })
            .collect()
    }
}

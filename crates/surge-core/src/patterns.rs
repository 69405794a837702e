//! Time-of-day and day-of-week market patterns.
//!
//! Demand and supply follow an hourly table multiplied by a weekday table
//! (Monday = 0). Traffic has its own rule set: rush hours and weekend
//! afternoon/evening peaks. Hour and weekday are taken from local wall-clock
//! time, either the host time zone or a configured fixed UTC offset.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime, Timelike, Utc};
use serde::Deserialize;

/// Rider demand multiplier per hour of day (index 0 = midnight).
pub const HOURLY_DEMAND: [f64; 24] = [
    0.3, 0.2, 0.15, 0.1, 0.1, 0.2, // night
    0.4, 0.8, 1.2, 0.9, 0.7, 0.8, // morning rush
    1.0, 0.9, 0.8, 0.9, 1.1, 1.5, // afternoon
    1.8, 1.6, 1.3, 1.1, 0.8, 0.5, // evening peak
];

/// Driver supply multiplier per hour of day (index 0 = midnight).
pub const HOURLY_SUPPLY: [f64; 24] = [
    0.4, 0.3, 0.2, 0.15, 0.2, 0.3, // night
    0.6, 1.0, 1.3, 1.2, 1.0, 1.0, // morning rush
    1.1, 1.0, 1.0, 1.0, 1.1, 1.2, // afternoon
    1.4, 1.3, 1.1, 0.9, 0.7, 0.5, // evening peak
];

/// Rider demand multiplier per weekday (index 0 = Monday).
pub const DAILY_DEMAND: [f64; 7] = [1.0, 1.0, 1.0, 1.1, 1.2, 1.4, 1.1];

/// Driver supply multiplier per weekday (index 0 = Monday).
pub const DAILY_SUPPLY: [f64; 7] = [1.0, 1.0, 1.0, 1.0, 1.0, 1.2, 0.9];

/// Traffic multiplier during the morning and evening rush.
pub const RUSH_HOUR_TRAFFIC: f64 = 1.5;

/// Traffic multiplier on weekend afternoons (12:00-16:59).
pub const WEEKEND_AFTERNOON_TRAFFIC: f64 = 1.2;

/// Traffic multiplier on weekend evenings (20:00-23:59).
pub const WEEKEND_EVENING_TRAFFIC: f64 = 1.3;

/// Local hour of day and weekday a tick or forecast slot falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Day of week, Monday = 0.
    pub weekday: u32,
}

impl TimeSlot {
    /// Slot of a local wall-clock time.
    pub fn of(local: &NaiveDateTime) -> Self {
        Self {
            hour: local.hour(),
            weekday: local.weekday().num_days_from_monday(),
        }
    }

    /// Slot of a UTC instant, converted with [`local_time`].
    pub fn at(now: DateTime<Utc>, utc_offset_minutes: Option<i32>) -> Self {
        Self::of(&local_time(now, utc_offset_minutes))
    }

    /// Whether the hour is in the morning (07-09) or evening (17-19) rush.
    pub const fn is_rush_hour(self) -> bool {
        matches!(self.hour, 7..=9 | 17..=19)
    }

    /// Saturday or Sunday.
    pub const fn is_weekend(self) -> bool {
        self.weekday >= 5
    }
}

/// Convert a UTC instant to local wall-clock time.
///
/// A configured offset wins over the host time zone. An offset chrono
/// rejects falls back to UTC.
pub fn local_time(now: DateTime<Utc>, utc_offset_minutes: Option<i32>) -> NaiveDateTime {
    match utc_offset_minutes {
        Some(minutes) => FixedOffset::east_opt(minutes.saturating_mul(60)).map_or_else(
            || now.naive_utc(),
            |offset| now.with_timezone(&offset).naive_local(),
        ),
        None => now.with_timezone(&Local).naive_local(),
    }
}

/// Hourly and weekday multiplier tables for demand and supply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketPatterns {
    /// Demand multiplier per hour of day.
    #[serde(default = "default_hourly_demand")]
    pub hourly_demand: [f64; 24],
    /// Supply multiplier per hour of day.
    #[serde(default = "default_hourly_supply")]
    pub hourly_supply: [f64; 24],
    /// Demand multiplier per weekday.
    #[serde(default = "default_daily_demand")]
    pub daily_demand: [f64; 7],
    /// Supply multiplier per weekday.
    #[serde(default = "default_daily_supply")]
    pub daily_supply: [f64; 7],
}

impl MarketPatterns {
    /// Expected demand multiplier for a slot (before noise and clamping).
    pub fn demand(&self, slot: TimeSlot) -> f64 {
        lookup(&self.hourly_demand, slot.hour) * lookup(&self.daily_demand, slot.weekday)
    }

    /// Expected supply multiplier for a slot (before noise and clamping).
    pub fn supply(&self, slot: TimeSlot) -> f64 {
        lookup(&self.hourly_supply, slot.hour) * lookup(&self.daily_supply, slot.weekday)
    }

    /// Deterministic part of the traffic factor for a slot.
    pub fn traffic_base(slot: TimeSlot) -> f64 {
        let mut traffic = 1.0;
        if slot.is_rush_hour() {
            traffic *= RUSH_HOUR_TRAFFIC;
        }
        if slot.is_weekend() {
            match slot.hour {
                12..=16 => traffic *= WEEKEND_AFTERNOON_TRAFFIC,
                20..=23 => traffic *= WEEKEND_EVENING_TRAFFIC,
                _ => {}
            }
        }
        traffic
    }

    /// Check every entry is finite and non-negative.
    pub fn validate(&self) -> Result<(), String> {
        let tables: [(&str, &[f64]); 4] = [
            ("hourly_demand", &self.hourly_demand),
            ("hourly_supply", &self.hourly_supply),
            ("daily_demand", &self.daily_demand),
            ("daily_supply", &self.daily_supply),
        ];
        for (name, table) in tables {
            if table.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(format!(
                    "dynamics.patterns.{name} entries must be finite and non-negative"
                ));
            }
        }
        Ok(())
    }
}

impl Default for MarketPatterns {
    fn default() -> Self {
        Self {
            hourly_demand: HOURLY_DEMAND,
            hourly_supply: HOURLY_SUPPLY,
            daily_demand: DAILY_DEMAND,
            daily_supply: DAILY_SUPPLY,
        }
    }
}

fn lookup(table: &[f64], index: u32) -> f64 {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .copied()
        .unwrap_or(1.0)
}

const fn default_hourly_demand() -> [f64; 24] {
    HOURLY_DEMAND
}

const fn default_hourly_supply() -> [f64; 24] {
    HOURLY_SUPPLY
}

const fn default_daily_demand() -> [f64; 7] {
    DAILY_DEMAND
}

const fn default_daily_supply() -> [f64; 7] {
    DAILY_SUPPLY
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn slot(hour: u32, weekday: u32) -> TimeSlot {
        TimeSlot { hour, weekday }
    }

    #[test]
    fn demand_combines_hourly_and_daily_tables() {
        let patterns = MarketPatterns::default();
        // Saturday 18:00: 1.8 * 1.4
        assert!((patterns.demand(slot(18, 5)) - 2.52).abs() < 1e-9);
        // Monday 03:00: 0.1 * 1.0
        assert!((patterns.demand(slot(3, 0)) - 0.1).abs() < 1e-9);
        // Sunday 08:00 supply: 1.3 * 0.9
        assert!((patterns.supply(slot(8, 6)) - 1.17).abs() < 1e-9);
    }

    #[test]
    fn rush_hour_bounds_are_inclusive() {
        assert!(slot(7, 0).is_rush_hour());
        assert!(slot(9, 0).is_rush_hour());
        assert!(!slot(10, 0).is_rush_hour());
        assert!(slot(17, 3).is_rush_hour());
        assert!(slot(19, 3).is_rush_hour());
        assert!(!slot(20, 3).is_rush_hour());
    }

    #[test]
    fn traffic_base_applies_rush_and_weekend_rules() {
        assert!((MarketPatterns::traffic_base(slot(3, 1)) - 1.0).abs() < 1e-9);
        assert!((MarketPatterns::traffic_base(slot(8, 1)) - 1.5).abs() < 1e-9);
        assert!((MarketPatterns::traffic_base(slot(14, 5)) - 1.2).abs() < 1e-9);
        assert!((MarketPatterns::traffic_base(slot(21, 6)) - 1.3).abs() < 1e-9);
        // Weekday afternoon has no weekend bump.
        assert!((MarketPatterns::traffic_base(slot(14, 2)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_offset_shifts_hour_and_weekday() {
        // Monday 02:30 UTC is Sunday 21:30 at UTC-05:00.
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 2, 30, 0).unwrap();
        let utc = TimeSlot::at(now, Some(0));
        assert_eq!(utc, slot(2, 0));
        let eastern = TimeSlot::at(now, Some(-300));
        assert_eq!(eastern, slot(21, 6));
    }

    #[test]
    fn out_of_range_index_falls_back_to_neutral() {
        let patterns = MarketPatterns::default();
        assert!((patterns.demand(slot(30, 0)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_negative_entries() {
        let mut patterns = MarketPatterns::default();
        assert!(patterns.validate().is_ok());
        patterns.daily_supply[2] = -0.5;
        assert!(patterns.validate().is_err());
    }
}

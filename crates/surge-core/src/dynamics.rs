//! Stochastic market dynamics.
//!
//! Each tick the [`DynamicsSimulator`] derives a fresh [`MarketState`] from
//! the time-of-day patterns, Gaussian noise, a weather Markov step, and a
//! traffic model with random incidents. It never touches the store: the
//! engine commits whatever [`DynamicsSimulator::step`] returns, and a failed
//! step leaves the previous snapshot authoritative.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, NormalError};
use surge_types::{MarketState, Weather};
use tracing::{debug, info};

use crate::config::DynamicsConfig;
use crate::error::MarketError;
use crate::patterns::{MarketPatterns, TimeSlot};
use crate::store::MarketBounds;

/// Errors that abort a single tick before anything is committed.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A derived level came out NaN or infinite.
    #[error("non-finite {field} produced by the dynamics step")]
    NonFiniteLevel {
        /// Which field was non-finite.
        field: &'static str,
    },

    /// A noise standard deviation was negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeNoise {
        /// Which standard deviation was negative.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A noise distribution could not be built from its parameters.
    #[error("invalid noise distribution: {source}")]
    Noise {
        /// The underlying distribution error.
        #[from]
        source: NormalError,
    },

    /// The store could not be read or written.
    #[error("store error: {source}")]
    Store {
        /// The underlying market error.
        #[from]
        source: MarketError,
    },
}

/// Produces the next market snapshot from the previous one.
#[derive(Debug)]
pub struct DynamicsSimulator {
    patterns: MarketPatterns,
    bounds: MarketBounds,
    rng: StdRng,
    demand_noise: Normal<f64>,
    supply_noise: Normal<f64>,
    traffic_noise: Normal<f64>,
    weather_change_probability: f64,
    incident_probability: f64,
    incident_min: f64,
    incident_max: f64,
    utc_offset_minutes: Option<i32>,
}

impl DynamicsSimulator {
    /// Build a simulator from configuration.
    ///
    /// Seeds from `config.seed` when present, otherwise from the OS.
    /// Negative noise deviations are rejected.
    pub fn new(config: &DynamicsConfig, bounds: MarketBounds) -> Result<Self, TickError> {
        for (field, sd) in [
            ("demand_noise_sd", config.demand_noise_sd),
            ("supply_noise_sd", config.supply_noise_sd),
            ("traffic_noise_sd", config.traffic_noise_sd),
        ] {
            if sd < 0.0 {
                return Err(TickError::NegativeNoise { field, value: sd });
            }
        }
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        info!(
            seeded = config.seed.is_some(),
            utc_offset_minutes = config.utc_offset_minutes,
            "Dynamics simulator initialized"
        );
        Ok(Self {
            patterns: config.patterns.clone(),
            bounds,
            rng,
            demand_noise: Normal::new(1.0, config.demand_noise_sd)?,
            supply_noise: Normal::new(1.0, config.supply_noise_sd)?,
            traffic_noise: Normal::new(0.0, config.traffic_noise_sd)?,
            weather_change_probability: config.weather_change_probability,
            incident_probability: config.incident_probability,
            incident_min: config.incident_min,
            incident_max: config.incident_max,
            utc_offset_minutes: config.utc_offset_minutes,
        })
    }

    /// Derive the next snapshot.
    ///
    /// The result is clamped to the level and traffic ranges and carries a
    /// timestamp no earlier than `prev.timestamp`. Its sequence number is
    /// assigned by the store on commit.
    pub fn step(&mut self, prev: &MarketState, now: DateTime<Utc>) -> Result<MarketState, TickError> {
        let slot = TimeSlot::at(now, self.utc_offset_minutes);

        let raw_demand = self.patterns.demand(slot) * self.demand_noise.sample(&mut self.rng);
        let raw_supply = self.patterns.supply(slot) * self.supply_noise.sample(&mut self.rng);
        let demand = self.bounds.clamp_level(finite(raw_demand, "demand")?);
        let supply = self.bounds.clamp_level(finite(raw_supply, "supply")?);

        let weather = self.next_weather(prev.weather);
        let traffic_factor = MarketBounds::clamp_traffic(finite(
            self.next_traffic(slot),
            "traffic_factor",
        )?);

        let timestamp = if now < prev.timestamp { prev.timestamp } else { now };

        debug!(
            hour = slot.hour,
            weekday = slot.weekday,
            demand,
            supply,
            %weather,
            traffic_factor,
            "Dynamics step"
        );

        Ok(MarketState::new(demand, supply, weather, traffic_factor, timestamp))
    }

    fn next_weather(&mut self, current: Weather) -> Weather {
        if self.rng.random::<f64>() < self.weather_change_probability {
            let next = Weather::ALL
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(current);
            if next != current {
                info!(from = %current, to = %next, "Weather changed");
            }
            next
        } else {
            current
        }
    }

    fn next_traffic(&mut self, slot: TimeSlot) -> f64 {
        let mut traffic = MarketPatterns::traffic_base(slot);
        if self.rng.random::<f64>() < self.incident_probability {
            let severity = self.incident_min
                + (self.incident_max - self.incident_min) * self.rng.random::<f64>();
            debug!(severity, "Traffic incident");
            traffic *= severity;
        }
        traffic + self.traffic_noise.sample(&mut self.rng)
    }
}

const fn finite(value: f64, field: &'static str) -> Result<f64, TickError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TickError::NonFiniteLevel { field })
    }
}

//! Random city events that push rider demand up.
//!
//! At most one event is active per draw. Each kind carries a fixed demand
//! impact and expected duration, and affects one to three boroughs.

use rand::Rng;
use rand::seq::IndexedRandom;
use surge_types::{Borough, EventKind, MarketEvent};

/// Most boroughs a single event can affect.
const MAX_AFFECTED_BOROUGHS: usize = 3;

/// Demand multiplier applied while an event of this kind is active.
pub const fn impact_multiplier(kind: EventKind) -> f64 {
    match kind {
        EventKind::Concert => 1.4,
        EventKind::SportsGame => 1.6,
        EventKind::WeatherAlert => 1.3,
        EventKind::TrafficIncident => 1.5,
        EventKind::PublicTransportDelay => 1.7,
    }
}

/// Expected duration of an event of this kind, in minutes.
pub const fn duration_minutes(kind: EventKind) -> u32 {
    match kind {
        EventKind::Concert => 180,
        EventKind::SportsGame => 240,
        EventKind::WeatherAlert => 120,
        EventKind::TrafficIncident => 90,
        EventKind::PublicTransportDelay => 150,
    }
}

/// Draws the currently active city events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventModel {
    probability: f64,
}

impl EventModel {
    /// A model where an event is active with `probability` per draw,
    /// clamped to `[0, 1]` (NaN means never).
    pub const fn new(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self { probability }
    }

    /// Chance that a draw yields an event.
    pub const fn probability(&self) -> f64 {
        self.probability
    }

    /// Zero or one active event.
    pub fn active_events<R: Rng>(&self, rng: &mut R) -> Vec<MarketEvent> {
        if !rng.random_bool(self.probability) {
            return Vec::new();
        }
        let Some(&kind) = EventKind::ALL.choose(rng) else {
            return Vec::new();
        };
        let count = rng.random_range(1..=MAX_AFFECTED_BOROUGHS);
        let mut affected_zones: Vec<Borough> =
            Borough::ALL.choose_multiple(rng, count).copied().collect();
        affected_zones.sort_unstable();

        vec![MarketEvent {
            kind,
            description: format!("Active {} affecting demand", kind.label()),
            impact_multiplier: impact_multiplier(kind),
            estimated_duration: duration_minutes(kind),
            affected_zones,
        }]
    }
}

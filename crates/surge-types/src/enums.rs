//! Enumeration types for the Surge pricing engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Current weather condition over the service area.
///
/// Weather raises prices through the configured weather impact table and,
/// above an impact of 1.2, nudges the surge multiplier as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Weather {
    /// No weather effects.
    Clear,
    /// Wet roads, moderate demand boost.
    Rain,
    /// Heavy demand boost, slow traffic.
    Snow,
    /// Reduced visibility.
    Fog,
}

impl Weather {
    /// Every weather state, in declaration order.
    pub const ALL: [Self; 4] = [Self::Clear, Self::Rain, Self::Snow, Self::Fog];

    /// Lowercase name as it appears on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Fog => "fog",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ride class
// ---------------------------------------------------------------------------

/// Product tier requested by the rider. Each class has its own tariff.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum RideClass {
    /// Standard shared-car tier.
    #[default]
    Economy,
    /// Newer cars, extra legroom.
    Comfort,
    /// High-end cars.
    Premium,
    /// Top tier.
    Luxury,
}

impl RideClass {
    /// Every ride class, cheapest first.
    pub const ALL: [Self; 4] = [Self::Economy, Self::Comfort, Self::Premium, Self::Luxury];

    /// Lowercase name as it appears on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Economy => "economy",
            Self::Comfort => "comfort",
            Self::Premium => "premium",
            Self::Luxury => "luxury",
        }
    }
}

impl fmt::Display for RideClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Surge band
// ---------------------------------------------------------------------------

/// Coarse classification of a surge multiplier for map overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SurgeBand {
    /// Below 1.2x.
    Low,
    /// 1.2x up to 1.5x.
    Moderate,
    /// 1.5x up to 2.0x.
    High,
    /// 2.0x and above.
    Extreme,
}

impl SurgeBand {
    /// Classify a surge multiplier.
    pub fn classify(multiplier: f64) -> Self {
        if multiplier < 1.2 {
            Self::Low
        } else if multiplier < 1.5 {
            Self::Moderate
        } else if multiplier < 2.0 {
            Self::High
        } else {
            Self::Extreme
        }
    }
}

// ---------------------------------------------------------------------------
// Market events
// ---------------------------------------------------------------------------

/// Kind of city event that pushes rider demand up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// Concert letting out.
    Concert,
    /// Stadium or arena game.
    SportsGame,
    /// Severe weather warning.
    WeatherAlert,
    /// Crash or closure on a major road.
    TrafficIncident,
    /// Subway or bus disruption.
    PublicTransportDelay,
}

impl EventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Concert,
        Self::SportsGame,
        Self::WeatherAlert,
        Self::TrafficIncident,
        Self::PublicTransportDelay,
    ];

    /// Human-readable name, e.g. `sports game`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Concert => "concert",
            Self::SportsGame => "sports game",
            Self::WeatherAlert => "weather alert",
            Self::TrafficIncident => "traffic incident",
            Self::PublicTransportDelay => "public transport delay",
        }
    }
}

/// Borough an event affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Borough {
    /// Manhattan.
    Manhattan,
    /// Brooklyn.
    Brooklyn,
    /// Queens.
    Queens,
    /// The Bronx.
    Bronx,
}

impl Borough {
    /// Every borough events can affect.
    pub const ALL: [Self; 4] = [Self::Manhattan, Self::Brooklyn, Self::Queens, Self::Bronx];
}

// ---------------------------------------------------------------------------
// Stream message discriminator
// ---------------------------------------------------------------------------

/// Discriminator carried in the `type` field of streamed messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum UpdateKind {
    /// A periodic market snapshot produced by one tick.
    #[default]
    MarketUpdate,
}

//! Per-neighbourhood surge view around the current global surge.

use chrono::{DateTime, Utc};
use rand::Rng;
use surge_types::{SurgeBand, SurgeZone};

use crate::patterns::TimeSlot;
use crate::surge::{SURGE_MAX, SURGE_MIN, round_dp};

/// A fixed neighbourhood the zone view reports on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneSpec {
    /// Neighbourhood name.
    pub name: &'static str,
    /// Centre latitude.
    pub lat: f64,
    /// Centre longitude.
    pub lng: f64,
    /// Business district that surges harder during rush hour.
    pub rush_hotspot: bool,
}

/// Neighbourhoods covered by the zone view.
pub const NYC_ZONES: [ZoneSpec; 8] = [
    zone("Manhattan Midtown", 40.7549, -73.9840, true),
    zone("Financial District", 40.7074, -74.0113, true),
    zone("Brooklyn Heights", 40.6962, -73.9961, false),
    zone("Long Island City", 40.7505, -73.9426, false),
    zone("Williamsburg", 40.7081, -73.9571, false),
    zone("Upper East Side", 40.7736, -73.9566, false),
    zone("Greenwich Village", 40.7336, -74.0027, false),
    zone("Chinatown", 40.7157, -73.9970, false),
];

const ZONE_SPREAD_MIN: f64 = 0.85;
const ZONE_SPREAD_MAX: f64 = 1.25;
const RUSH_HOTSPOT_FACTOR: f64 = 1.3;

const fn zone(name: &'static str, lat: f64, lng: f64, rush_hotspot: bool) -> ZoneSpec {
    ZoneSpec {
        name,
        lat,
        lng,
        rush_hotspot,
    }
}

/// Spreads the global surge across the fixed neighbourhoods.
#[derive(Debug, Clone)]
pub struct SurgeZoneModel {
    zones: Vec<ZoneSpec>,
    utc_offset_minutes: Option<i32>,
}

impl SurgeZoneModel {
    /// A model over [`NYC_ZONES`].
    pub fn new(utc_offset_minutes: Option<i32>) -> Self {
        Self {
            zones: NYC_ZONES.to_vec(),
            utc_offset_minutes,
        }
    }

    /// Zone surges for the current global surge.
    ///
    /// Each zone gets the global surge times a uniform draw in
    /// `[0.85, 1.25)`, times 1.3 for business districts during rush hour,
    /// clamped to the surge range and rounded to 1 decimal.
    pub fn zones<R: Rng>(
        &self,
        global_surge: f64,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<SurgeZone> {
        let rush = TimeSlot::at(now, self.utc_offset_minutes).is_rush_hour();
        self.zones
            .iter()
            .map(|spec| {
                let mut surge = global_surge * rng.random_range(ZONE_SPREAD_MIN..ZONE_SPREAD_MAX);
                if rush && spec.rush_hotspot {
                    surge *= RUSH_HOTSPOT_FACTOR;
                }
                let surge = round_dp(surge.clamp(SURGE_MIN, SURGE_MAX), 1);
                SurgeZone {
                    name: spec.name.to_owned(),
                    center: [spec.lat, spec.lng],
                    surge_multiplier: surge,
                    band: SurgeBand::classify(surge),
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn every_zone_reported_within_range() {
        let model = SurgeZoneModel::new(Some(0));
        let mut rng = StdRng::seed_from_u64(1);
        let zones = model.zones(2.9, Utc::now(), &mut rng);
        assert_eq!(zones.len(), 8);
        for zone in &zones {
            assert!((SURGE_MIN..=SURGE_MAX).contains(&zone.surge_multiplier));
            assert_eq!(zone.band, SurgeBand::classify(zone.surge_multiplier));
        }
    }

    #[test]
    fn hotspots_surge_harder_at_rush_hour() {
        let model = SurgeZoneModel::new(Some(0));
        let rush = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let zones = model.zones(1.5, rush, &mut rng);
        let midtown = zones.iter().find(|z| z.name == "Manhattan Midtown").unwrap();
        // 1.5 * 0.85 * 1.3 is the smallest possible hotspot surge.
        assert!(midtown.surge_multiplier >= 1.6);
    }

    #[test]
    fn calm_market_stays_low() {
        let model = SurgeZoneModel::new(Some(0));
        let night = Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for zone in model.zones(1.0, night, &mut rng) {
            assert!(zone.surge_multiplier < 1.3);
        }
    }
}

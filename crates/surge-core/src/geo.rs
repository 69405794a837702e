//! Great-circle distance and travel-time estimates.
//!
//! Distances use the Haversine formula on a spherical Earth of radius
//! [`EARTH_RADIUS_KM`]. All functions are pure.

use crate::error::MarketError;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Validate and build a point.
    ///
    /// `lat_field` and `lng_field` name the request fields so errors point
    /// at the right input.
    pub fn new(
        lat: f64,
        lng: f64,
        lat_field: &'static str,
        lng_field: &'static str,
    ) -> Result<Self, MarketError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(MarketError::InvalidGeometry {
                field: lat_field,
                value: lat,
            });
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(MarketError::InvalidGeometry {
                field: lng_field,
                value: lng,
            });
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub const fn lng(&self) -> f64 {
        self.lng
    }
}

/// Great-circle distance between two validated points in kilometres.
///
/// Symmetric, and exactly zero for identical points.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

/// Validate raw coordinates and return the distance between them.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Result<f64, MarketError> {
    let a = GeoPoint::new(lat1, lng1, "lat1", "lng1")?;
    let b = GeoPoint::new(lat2, lng2, "lat2", "lng2")?;
    Ok(haversine_km(a, b))
}

/// Estimated trip duration in whole minutes, never less than 1.
///
/// Effective speed is `base_speed_kmh / traffic_factor`; the result is
/// rounded to the nearest minute.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn eta_minutes(distance_km: f64, traffic_factor: f64, base_speed_kmh: f64) -> u32 {
    let speed = base_speed_kmh / traffic_factor.max(1.0);
    let minutes = (distance_km / speed * 60.0).round();
    if !minutes.is_finite() || minutes < 1.0 {
        return 1;
    }
    // Saturates at u32::MAX.
    minutes.min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng, "lat", "lng").unwrap()
    }

    #[test]
    fn times_square_to_empire_state() {
        let d = distance_km(40.7589, -73.9851, 40.7484, -73.9857).unwrap();
        assert!((1.1..1.25).contains(&d), "distance was {d}");
        let eta = eta_minutes(d, 1.0, 30.0);
        assert!((2..=3).contains(&eta), "eta was {eta}");
    }

    #[test]
    fn distance_is_zero_for_identical_points() {
        let p = point(40.7128, -74.0060);
        assert!(haversine_km(p, p).abs() < f64::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = point(40.7589, -73.9851);
        let b = point(40.6413, -73.7781);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-12);
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let err = distance_km(91.0, 0.0, 0.0, 0.0).unwrap_err();
        assert_eq!(
            err,
            MarketError::InvalidGeometry {
                field: "lat1",
                value: 91.0
            }
        );
    }

    #[test]
    fn rejects_non_finite_longitude() {
        let err = GeoPoint::new(0.0, f64::NAN, "pickup_lat", "pickup_lng").unwrap_err();
        assert!(matches!(
            err,
            MarketError::InvalidGeometry {
                field: "pickup_lng",
                ..
            }
        ));
    }

    #[test]
    fn eta_has_one_minute_floor() {
        assert_eq!(eta_minutes(0.0, 1.0, 30.0), 1);
        assert_eq!(eta_minutes(0.01, 1.0, 30.0), 1);
    }

    #[test]
    fn traffic_slows_eta() {
        let free = eta_minutes(10.0, 1.0, 30.0);
        let jammed = eta_minutes(10.0, 2.0, 30.0);
        assert_eq!(free, 20);
        assert_eq!(jammed, 40);
    }
}

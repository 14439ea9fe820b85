//! Geofence arithmetic: great-circle distance and radius checks.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and inside the valid degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Inclusive: standing exactly on the boundary counts as inside.
pub fn within_radius(distance_m: f64, radius_m: f64) -> bool {
    distance_m <= radius_m
}

/// The location's own radius when set and positive, otherwise the system default.
pub fn effective_radius(configured: Option<i32>, default_m: u32) -> f64 {
    match configured {
        Some(r) if r > 0 => f64::from(r),
        _ => f64::from(default_m),
    }
}

/// Shifts `origin` due north by `meters`. Handy for building fixtures at a known distance.
pub fn offset_north(origin: GeoPoint, meters: f64) -> GeoPoint {
    let dlat = (meters / EARTH_RADIUS_M).to_degrees();
    GeoPoint::new(origin.lat + dlat, origin.lng)
}

//! Geodesic math module
//!
//! Provides great-circle distance and initial bearing between geographic
//! coordinates, plus the fixed-precision key used to cache per-coordinate
//! lookups.
//!
//! All angles passed in and out of [`GeoCoordinate`] are degrees. Bearings
//! returned by [`bearing`] are radians in `[0, 2π)`, where 0 = North and
//! π/2 = East.

mod types;

pub use types::{
    CoordError, CoordinateKey, GeoCoordinate, DEFAULT_KEY_PRECISION, MAX_KEY_PRECISION,
};

use std::f64::consts::{PI, TAU};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Converts degrees to radians.
#[inline]
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees / 180.0 * PI
}

/// Converts radians to degrees.
#[inline]
pub fn rad_to_deg(radians: f64) -> f64 {
    radians * 180.0 / PI
}

/// Great-circle distance between two coordinates in meters (haversine).
///
/// The result is symmetric in its arguments and exactly zero for identical
/// coordinates.
#[inline]
pub fn distance(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
    let lat1 = deg_to_rad(a.latitude);
    let lat2 = deg_to_rad(b.latitude);
    let dlat = lat2 - lat1;
    let dlon = deg_to_rad(b.longitude - a.longitude);

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h marginally past 1.0 for antipodal points
    2.0 * EARTH_RADIUS_M * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Initial bearing from `a` to `b` in radians, in `[0, 2π)`.
///
/// Bearing is undefined for identical coordinates; 0 is returned in that case.
#[inline]
pub fn bearing(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = deg_to_rad(a.latitude);
    let lat2 = deg_to_rad(b.latitude);
    let dlon = deg_to_rad(b.longitude - a.longitude);

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = y.atan2(x).rem_euclid(TAU);
    if bearing >= TAU {
        0.0
    } else {
        bearing
    }
}

/// Distance between two successive fixes in meters.
///
/// Geodesic counterpart of [`crate::pose::pose_delta`], used for
/// change detection.
#[inline]
pub fn coordinate_delta(old: &GeoCoordinate, new: &GeoCoordinate) -> f64 {
    distance(old, new)
}

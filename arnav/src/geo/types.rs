//! Coordinate types for the geo module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of decimal places kept in a [`CoordinateKey`].
///
/// Five decimal places is about 1.1 m at the equator, well inside typical
/// GPS noise, so repeated lookups for a stationary user hit the same key.
pub const DEFAULT_KEY_PRECISION: u8 = 5;

/// Largest precision accepted by [`CoordinateKey::new`].
///
/// 10^9 × 180 still fits comfortably in an `i64`.
pub const MAX_KEY_PRECISION: u8 = 9;

/// Errors for invalid coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be within -90..=90)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be within -180..=180)")]
    InvalidLongitude(f64),
}

/// A geographic coordinate in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Create a coordinate without validation.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a coordinate, rejecting out-of-range or non-finite values.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self::new(latitude, longitude))
    }

    /// Whether both components are finite and within range.
    pub fn is_valid(&self) -> bool {
        Self::try_new(self.latitude, self.longitude).is_ok()
    }

    /// Quantized hash key for this coordinate.
    pub fn cache_key(&self, precision: u8) -> CoordinateKey {
        CoordinateKey::new(self, precision)
    }
}

impl std::fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl std::str::FromStr for GeoCoordinate {
    type Err = String;

    /// Parses `"lat,lon"` (whitespace around either part is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected 'lat,lon', got '{}'", s))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
        Self::try_new(lat, lon).map_err(|e| e.to_string())
    }
}

/// Hashable, fixed-precision form of a [`GeoCoordinate`].
///
/// Both components are rounded to `precision` decimal places and stored as
/// integers, so equality is exact on the quantized grid rather than on raw
/// floating point values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lat: i64,
    lon: i64,
    precision: u8,
}

impl CoordinateKey {
    /// Quantize a coordinate. Precision is capped at 9 decimal places.
    pub fn new(coord: &GeoCoordinate, precision: u8) -> Self {
        let precision = precision.min(MAX_KEY_PRECISION);
        let scale = 10f64.powi(precision as i32);
        Self {
            lat: (coord.latitude * scale).round() as i64,
            lon: (coord.longitude * scale).round() as i64,
            precision,
        }
    }

    /// The centre of the quantization cell this key represents.
    pub fn to_coordinate(&self) -> GeoCoordinate {
        let scale = 10f64.powi(self.precision as i32);
        GeoCoordinate::new(self.lat as f64 / scale, self.lon as f64 / scale)
    }

    /// Number of decimal places kept.
    pub fn precision(&self) -> u8 {
        self.precision
    }
}

impl std::fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = self.to_coordinate();
        write!(
            f,
            "{:.*},{:.*}",
            self.precision as usize, c.latitude, self.precision as usize, c.longitude
        )
    }
}

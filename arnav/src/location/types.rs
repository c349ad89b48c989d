//! Request and response types for location services.

use serde::{Deserialize, Serialize};

use crate::geo::GeoCoordinate;

/// Default search region span in degrees (both axes).
pub const DEFAULT_SEARCH_SPAN_DEG: f64 = 0.1;

/// How the route is travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    #[default]
    Walking,
    Automobile,
    Transit,
    Any,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Walking => "walking",
            TransportType::Automobile => "automobile",
            TransportType::Transit => "transit",
            TransportType::Any => "any",
        }
    }
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One manoeuvre of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Where the step ends.
    pub coordinate: GeoCoordinate,
    /// Human-readable instruction.
    #[serde(default)]
    pub instructions: String,
    /// Step length in meters.
    #[serde(default)]
    pub distance_m: f64,
}

impl RouteStep {
    pub fn new(coordinate: GeoCoordinate, instructions: impl Into<String>, distance_m: f64) -> Self {
        Self {
            coordinate,
            instructions: instructions.into(),
            distance_m,
        }
    }
}

/// A route returned by a directions provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub name: String,
    /// Total length in meters.
    #[serde(default)]
    pub distance_m: f64,
    /// Expected travel time in seconds.
    #[serde(default)]
    pub expected_travel_time_s: f64,
    #[serde(default)]
    pub transport: TransportType,
    pub steps: Vec<RouteStep>,
}

/// Directions query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub source: GeoCoordinate,
    pub destination: GeoCoordinate,
    pub transport: TransportType,
}

/// Reverse-geocoded place.
///
/// All parts are optional; providers fill what they know.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaceDescription {
    pub name: Option<String>,
    pub locality: Option<String>,
    pub sub_locality: Option<String>,
    pub administrative_area: Option<String>,
    pub country: Option<String>,
}

impl PlaceDescription {
    /// Primary line: the place name, or empty.
    pub fn main_info(&self) -> String {
        self.name.clone().unwrap_or_default()
    }

    /// Secondary line: locality, sub-locality, area and country joined by
    /// `", "`, skipping missing parts.
    pub fn sub_info(&self) -> String {
        [
            &self.locality,
            &self.sub_locality,
            &self.administrative_area,
            &self.country,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Latitude/longitude span in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpan {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl CoordinateSpan {
    pub const fn square(delta: f64) -> Self {
        Self {
            latitude_delta: delta,
            longitude_delta: delta,
        }
    }
}

/// Rectangular region centred on a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRegion {
    pub center: GeoCoordinate,
    pub span: CoordinateSpan,
}

impl CoordinateRegion {
    pub fn new(center: GeoCoordinate, span: CoordinateSpan) -> Self {
        Self { center, span }
    }

    /// Whether a coordinate falls inside the region (edges inclusive).
    pub fn contains(&self, coord: &GeoCoordinate) -> bool {
        (coord.latitude - self.center.latitude).abs() <= self.span.latitude_delta / 2.0
            && (coord.longitude - self.center.longitude).abs() <= self.span.longitude_delta / 2.0
    }
}

/// Search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapItem {
    pub name: String,
    pub coordinate: GeoCoordinate,
    #[serde(default)]
    pub place: Option<PlaceDescription>,
}

/// Free-text place search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Region to bias results towards, if a location is known.
    pub region: Option<CoordinateRegion>,
}

/// Search result: bounding region of all hits plus the hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub region: CoordinateRegion,
    pub items: Vec<MapItem>,
}

/// Location permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Authorized,
    Denied,
    Restricted,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::Authorized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::NotDetermined => "not_determined",
            AuthorizationStatus::Authorized => "authorized",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Restricted => "restricted",
        }
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: GeoCoordinate,
    /// Horizontal accuracy in meters; negative means invalid.
    #[serde(default)]
    pub horizontal_accuracy: f64,
}

impl LocationFix {
    pub fn new(coordinate: GeoCoordinate) -> Self {
        Self {
            coordinate,
            horizontal_accuracy: 0.0,
        }
    }
}

/// A compass reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Degrees clockwise from true north.
    pub true_heading: f64,
    /// Degrees clockwise from magnetic north.
    #[serde(default)]
    pub magnetic_heading: f64,
    /// Accuracy in degrees; negative means the reading is invalid.
    pub accuracy: f64,
}

impl Heading {
    pub fn is_valid(&self) -> bool {
        self.accuracy >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_info_skips_missing_parts() {
        let place = PlaceDescription {
            name: Some("Ferry Building".into()),
            locality: None,
            sub_locality: Some("Embarcadero".into()),
            administrative_area: Some("CA".into()),
            country: Some("United States".into()),
        };
        assert_eq!(place.main_info(), "Ferry Building");
        assert_eq!(place.sub_info(), "Embarcadero, CA, United States");
    }

    #[test]
    fn test_empty_place_description() {
        let place = PlaceDescription::default();
        assert_eq!(place.main_info(), "");
        assert_eq!(place.sub_info(), "");
    }

    #[test]
    fn test_region_contains() {
        let region = CoordinateRegion::new(
            GeoCoordinate::new(10.0, 20.0),
            CoordinateSpan::square(DEFAULT_SEARCH_SPAN_DEG),
        );
        assert!(region.contains(&GeoCoordinate::new(10.04, 20.04)));
        assert!(!region.contains(&GeoCoordinate::new(10.2, 20.0)));
    }

    #[test]
    fn test_route_deserializes_with_defaults() {
        let json = r#"{"steps":[{"coordinate":{"latitude":1.0,"longitude":2.0}}]}"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert_eq!(route.transport, TransportType::Walking);
        assert_eq!(route.steps.len(), 1);
        assert_eq!(route.steps[0].instructions, "");
    }

    #[test]
    fn test_heading_validity() {
        let heading = Heading {
            true_heading: 90.0,
            magnetic_heading: 88.0,
            accuracy: -1.0,
        };
        assert!(!heading.is_valid());
    }
}

//! arnav - Route waypoints for camera-tracked AR walking navigation
//!
//! This library keeps 3D waypoint markers anchored to a walking route while
//! three signals update independently: the device pose from visual
//! tracking, GPS coordinates and compass heading, and the route steps from a
//! directions service.
//!
//! # Modules
//!
//! - [`geo`]: great-circle distance and bearing
//! - [`pose`]: rigid transforms and geodesic placement
//! - [`tracking`]: tracking-quality state machine
//! - [`scene`]: session lifecycle, surface anchors, scene-graph seam
//! - [`placement`]: per-tick waypoint re-anchoring
//! - [`location`]: authorization, fixes and provider requests
//! - [`config`]: INI configuration
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod geo;
pub mod location;
pub mod logging;
pub mod placement;
pub mod pose;
pub mod scene;
pub mod tracking;

pub use geo::GeoCoordinate;
pub use pose::Pose;

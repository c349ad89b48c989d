//! Dotted configuration keys (`section.key`).
//!
//! Every setting in [`ConfigFile`] has exactly one key. Keys drive both the
//! INI reader/writer and the `config get|set|list` commands, so validation
//! lives in one place.

use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use super::{ConfigError, ConfigFile};
use crate::geo::MAX_KEY_PRECISION;

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    PlacementMaxRenderDistance,
    PlacementRecomputeThreshold,
    PlacementWaypointRadius,
    SessionFallbackHeight,
    SessionDisplayFloor,
    SessionLightEstimation,
    SessionEventCapacity,
    LocationCachePrecision,
    LocationSearchSpan,
    LocationEventCapacity,
    LoggingLevel,
    LoggingFile,
}

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::PlacementMaxRenderDistance,
            ConfigKey::PlacementRecomputeThreshold,
            ConfigKey::PlacementWaypointRadius,
            ConfigKey::SessionFallbackHeight,
            ConfigKey::SessionDisplayFloor,
            ConfigKey::SessionLightEstimation,
            ConfigKey::SessionEventCapacity,
            ConfigKey::LocationCachePrecision,
            ConfigKey::LocationSearchSpan,
            ConfigKey::LocationEventCapacity,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingFile,
        ]
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::PlacementMaxRenderDistance
            | ConfigKey::PlacementRecomputeThreshold
            | ConfigKey::PlacementWaypointRadius => "placement",
            ConfigKey::SessionFallbackHeight
            | ConfigKey::SessionDisplayFloor
            | ConfigKey::SessionLightEstimation
            | ConfigKey::SessionEventCapacity => "session",
            ConfigKey::LocationCachePrecision
            | ConfigKey::LocationSearchSpan
            | ConfigKey::LocationEventCapacity => "location",
            ConfigKey::LoggingLevel | ConfigKey::LoggingFile => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::PlacementMaxRenderDistance => "max_render_distance",
            ConfigKey::PlacementRecomputeThreshold => "recompute_threshold",
            ConfigKey::PlacementWaypointRadius => "waypoint_radius",
            ConfigKey::SessionFallbackHeight => "fallback_height",
            ConfigKey::SessionDisplayFloor => "display_floor",
            ConfigKey::SessionLightEstimation => "light_estimation",
            ConfigKey::SessionEventCapacity => "event_capacity",
            ConfigKey::LocationCachePrecision => "cache_precision",
            ConfigKey::LocationSearchSpan => "search_span",
            ConfigKey::LocationEventCapacity => "event_capacity",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingFile => "file",
        }
    }

    /// Full dotted name, e.g. `placement.max_render_distance`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Look up a key by section and key name.
    pub fn find(section: &str, key: &str) -> Option<ConfigKey> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.section() == section && k.key_name() == key)
    }

    /// Current value as a string. Unset optional values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::PlacementMaxRenderDistance => {
                config.placement.max_render_distance.to_string()
            }
            ConfigKey::PlacementRecomputeThreshold => {
                config.placement.recompute_threshold.to_string()
            }
            ConfigKey::PlacementWaypointRadius => config.placement.waypoint_radius.to_string(),
            ConfigKey::SessionFallbackHeight => config.session.fallback_height.to_string(),
            ConfigKey::SessionDisplayFloor => config.session.display_floor.to_string(),
            ConfigKey::SessionLightEstimation => {
                config.session.tracking.light_estimation.to_string()
            }
            ConfigKey::SessionEventCapacity => config.session.event_capacity.to_string(),
            ConfigKey::LocationCachePrecision => config.location.cache_precision.to_string(),
            ConfigKey::LocationSearchSpan => config.location.search_span_deg.to_string(),
            ConfigKey::LocationEventCapacity => config.location.event_capacity.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse and store a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::PlacementMaxRenderDistance => {
                config.placement.max_render_distance = self.parse_f64(value, |v| v >= 0.0)?;
            }
            ConfigKey::PlacementRecomputeThreshold => {
                config.placement.recompute_threshold = self.parse_f64(value, |v| v >= 0.0)?;
            }
            ConfigKey::PlacementWaypointRadius => {
                config.placement.waypoint_radius = self.parse_f64(value, |v| v > 0.0)?;
            }
            ConfigKey::SessionFallbackHeight => {
                config.session.fallback_height = self.parse_f64(value, |_| true)?;
            }
            ConfigKey::SessionDisplayFloor => {
                config.session.display_floor = self.parse_bool(value)?;
            }
            ConfigKey::SessionLightEstimation => {
                config.session.tracking.light_estimation = self.parse_bool(value)?;
            }
            ConfigKey::SessionEventCapacity => {
                config.session.event_capacity = self.parse_capacity(value)?;
            }
            ConfigKey::LocationCachePrecision => {
                let precision: u8 = value.parse().map_err(|_| {
                    self.invalid(value, "expected an integer number of decimal places")
                })?;
                if precision > MAX_KEY_PRECISION {
                    return Err(self.invalid(
                        value,
                        &format!("at most {} decimal places", MAX_KEY_PRECISION),
                    ));
                }
                config.location.cache_precision = precision;
            }
            ConfigKey::LocationSearchSpan => {
                config.location.search_span_deg = self.parse_f64(value, |v| v > 0.0 && v <= 180.0)?;
            }
            ConfigKey::LocationEventCapacity => {
                config.location.event_capacity = self.parse_capacity(value)?;
            }
            ConfigKey::LoggingLevel => {
                EnvFilter::try_new(value)
                    .map_err(|e| self.invalid(value, &e.to_string()))?;
                config.logging.level = value.to_string();
            }
            ConfigKey::LoggingFile => {
                config.logging.file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_f64(&self, value: &str, accept: impl Fn(f64) -> bool) -> Result<f64, ConfigError> {
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() && accept(v) => Ok(v),
            Ok(_) => Err(self.invalid(value, "out of range")),
            Err(_) => Err(self.invalid(value, "expected a number")),
        }
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn parse_capacity(&self, value: &str) -> Result<usize, ConfigError> {
        match value.parse::<usize>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(self.invalid(value, "expected a positive integer")),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_once('.')
            .and_then(|(section, key)| ConfigKey::find(section, key))
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

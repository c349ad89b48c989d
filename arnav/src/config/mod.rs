//! Configuration file.
//!
//! Settings live in an INI file, by default at
//! `<platform config dir>/arnav/config.ini`. The `ARNAV_CONFIG` environment
//! variable overrides the location.
//!
//! # Example
//!
//! ```ini
//! [placement]
//! max_render_distance = 50
//! recompute_threshold = 0
//! waypoint_radius = 0.5
//!
//! [session]
//! fallback_height = -1.5
//! display_floor = true
//! light_estimation = true
//! event_capacity = 64
//!
//! [location]
//! cache_precision = 5
//! search_span = 0.1
//! event_capacity = 64
//!
//! [logging]
//! level = info
//! file = /var/log/arnav.log
//! ```
//!
//! Missing keys keep their defaults. Unknown keys are ignored with a warning.

mod keys;

pub use keys::ConfigKey;

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::location::LocationConfig;
use crate::logging::LoggingConfig;
use crate::placement::PlacementConfig;
use crate::scene::SessionConfig;

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "ARNAV_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Default config file location.
pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arnav")
        .join("config.ini")
}

/// All settings, one field per INI section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub placement: PlacementConfig,
    pub session: SessionConfig,
    pub location: LocationConfig,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (section, properties) in ini.iter() {
            let section = section.unwrap_or_default();
            for (key, value) in properties.iter() {
                match ConfigKey::find(section, key) {
                    Some(config_key) => config_key.set(&mut config, value)?,
                    None => tracing::warn!(section, key, "Ignoring unknown configuration key"),
                }
            }
        }
        Ok(config)
    }

    /// Render as INI. Unset optional values are omitted.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    /// Save to the default location, creating parent directories.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        self.to_ini().write_to_file(path).map_err(io_err)?;
        tracing::debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

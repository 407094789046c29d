//! Dashboard configuration.
//!
//! Defaults are embedded from `config/dashboard.toml` at compile time. A
//! different file may be loaded instead, and a handful of environment
//! variables override individual endpoints.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

const EMBEDDED_CONFIG: &str = include_str!("../config/dashboard.toml");

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML did not match the expected shape.
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Full dashboard configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardConfig {
    /// Hazard store connection.
    pub hazard_store: HazardStoreConfig,
    /// Road network source and cache tuning.
    pub road_network: RoadNetworkConfig,
    /// Survey service.
    pub survey: SurveyConfig,
    /// Initial map view.
    pub map: MapConfig,
}

/// `[hazard_store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HazardStoreConfig {
    /// Project URL; `/rest/v1/{table}` is appended.
    pub base_url: String,
    /// Anonymous API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Table holding hazard reports.
    pub table: String,
    /// Row cap for queries and facet snapshots.
    pub page_size: u32,
}

/// `[road_network]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoadNetworkConfig {
    /// Overpass interpreter URL.
    pub overpass_url: String,
    /// Overpass tag selector for road ways.
    pub way_selector: String,
    /// Server-side query timeout.
    pub timeout_secs: u32,
    /// Viewport quantization grid in degrees.
    pub quantum_deg: f64,
    /// Maximum cached networks.
    pub capacity: usize,
}

/// `[survey]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SurveyConfig {
    /// Survey endpoint.
    pub url: String,
    /// Sampling step sent with each request.
    #[serde(default)]
    pub grid_step: Option<f64>,
}

/// `[map]` section.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MapConfig {
    /// Initial center latitude.
    pub center_lat: f64,
    /// Initial center longitude.
    pub center_lon: f64,
    /// Initial zoom level.
    pub zoom: u8,
}

impl DashboardConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(s)?)
    }

    /// The compiled-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(EMBEDDED_CONFIG)
    }

    /// Reads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` if given, else the embedded defaults, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be read or
    /// parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::embedded()?,
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Replaces endpoints with values from `lookup` (normally the process
    /// environment). Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("HAZARD_STORE_URL") {
            self.hazard_store.base_url = url;
        }
        if let Some(key) = get("HAZARD_STORE_KEY") {
            self.hazard_store.api_key = Some(key);
        }
        if let Some(url) = get("OVERPASS_URL") {
            self.road_network.overpass_url = url;
        }
        if let Some(url) = get("SURVEY_URL") {
            self.survey.url = url;
        }
    }
}

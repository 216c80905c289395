use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Branch dataset (JSON array)
    pub dataset: PathBuf,
    pub geocoder: GeocoderConfig,
    pub icons: IconConfig,
    pub map: MapConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub enabled: bool,
    pub base_url: String,
    /// ISO 3166-1 alpha-2 codes the search is restricted to
    pub country_codes: Vec<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Nominatim usage policy allows at most one request per second
    pub min_interval_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub branch: String,
    pub location: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub style_url: String,
    /// `[lon, lat]`
    pub center: [f64; 2],
    pub zoom: f64,
    /// Navigation control shows a compass button
    pub show_compass: bool,
    /// Two-finger rotation on touch devices
    pub touch_rotation: bool,
    pub fit_padding: u32,
    pub fly_to_zoom: f64,
    pub branch_icon_size: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset: PathBuf::from("tci_branches.json"),
            geocoder: GeocoderConfig::default(),
            icons: IconConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        GeocoderConfig {
            enabled: true,
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            country_codes: vec!["in".to_string(), "np".to_string()],
            user_agent: concat!("branch_locator/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            min_interval_ms: 1000,
        }
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        IconConfig {
            branch: crate::branches::DEFAULT_BRANCH_ICON.to_string(),
            location: crate::search::DEFAULT_LOCATION_ICON.to_string(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            style_url: "https://tiles.openfreemap.org/styles/liberty".to_string(),
            center: [78.9629, 20.5937],
            zoom: 3.5,
            show_compass: false,
            touch_rotation: false,
            fit_padding: crate::route::FIT_PADDING_PX,
            fly_to_zoom: 12.0,
            branch_icon_size: 0.22,
        }
    }
}

impl Config {
    /// Load a JSON config file; missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

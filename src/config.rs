use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use tracing::{info, warn};

/// Environment variable consulted when `maps.api_key` is left empty.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub maps: MapsConfig,
    pub location: LocationConfig,
    pub positioning: PositioningConfig,
    pub picker: PickerConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapsConfig {
    pub api_key: String, // Empty means "read GOOGLE_MAPS_API_KEY"
    pub geocode_url: String,
    pub autocomplete_url: String,
    pub details_url: String,
    pub country: String,      // Autocomplete country filter
    pub bias_radius_m: u32,   // Radius around the current fix used to bias search
    pub request_timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub auto_fetch: bool,     // Run one acquisition cycle at startup
    pub freshness_secs: u64,  // Max age of a cached fix returned without a fresh one
    pub allow_location: bool, // Answer given when permission is requested
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PositioningConfig {
    pub high_accuracy_service: IpService,
    pub balanced_service: IpService,
    pub lookup_ip: String, // Empty means "my own public address"
    pub cache_path: String,
    pub geocoder_radius_km: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PickerConfig {
    pub debounce_ms: u64,
    pub min_query_len: usize,
}

/// IP geolocation providers understood by the desktop locator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IpService {
    IpApi,
    IpApiCo,
    IpWhois,
    FreeGeoIp,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            autocomplete_url: "https://maps.googleapis.com/maps/api/place/autocomplete/json"
                .to_string(),
            details_url: "https://maps.googleapis.com/maps/api/place/details/json".to_string(),
            country: "in".to_string(),
            bias_radius_m: 50_000,
            request_timeout_secs: 12,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            freshness_secs: 5 * 60,
            allow_location: true,
        }
    }
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            high_accuracy_service: IpService::IpApi,
            balanced_service: IpService::IpApiCo,
            lookup_ip: String::new(),
            cache_path: "location_cache.db".to_string(),
            geocoder_radius_km: 25.0,
        }
    }
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_len: 2,
        }
    }
}

impl MapsConfig {
    /// The configured key, or the environment fallback. `None` is reported as
    /// a configuration error by the first request that needs it.
    pub fn resolve_api_key(&self) -> Option<String> {
        let key = self.api_key.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl LocationConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

impl PickerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default configuration: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}

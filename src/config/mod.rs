//! Application configuration.
//!
//! Settings come from two places: the environment (`.env` via `dotenvy`) for
//! deployment values such as the database URL and bind address, and
//! `config.toml` for the versioned emission factor table, the achievement
//! catalog and the map asset location.

/// Achievement catalog loading from config.toml
pub mod achievements;

/// Database configuration and connection management
pub mod database;

/// Emission factor tables loaded from config.toml
pub mod factors;

/// Deployment settings read from environment variables
pub mod server;

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use achievements::AchievementConfig;
pub use factors::{CategoryFactors, EmissionFactors};
pub use server::ServerSettings;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Versioned emission factor tables
    pub factors: EmissionFactors,
    /// Badge catalog to seed
    #[serde(default)]
    pub achievements: Vec<AchievementConfig>,
    /// Choropleth map settings
    #[serde(default)]
    pub map: MapConfig,
}

/// Settings for the user density map
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// State boundary GeoJSON used by the choropleth renderer
    pub boundaries_path: PathBuf,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            boundaries_path: PathBuf::from("assets/indian_states.geojson"),
        }
    }
}

/// Parses and validates configuration from a TOML string.
///
/// # Errors
/// Returns `Error::Config` if the TOML is malformed, required fields are
/// missing, or the factor table fails validation.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.factors.validate()?;
    achievements::validate(&config.achievements)?;
    Ok(config)
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The factor table or achievement catalog is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_minimal_config_uses_map_default() {
        let config = parse_config(crate::test_utils::TEST_CONFIG).unwrap();
        assert_eq!(config.factors.version, "test-1");
        assert_eq!(
            config.map.boundaries_path,
            PathBuf::from("assets/indian_states.geojson")
        );
        assert!(!config.achievements.is_empty());
    }

    #[test]
    fn test_parse_config_rejects_missing_factors() {
        let result = parse_config("[map]\nboundaries_path = \"x.geojson\"\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = load_config(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
        assert!(config.factors.transport.default > 0.0);
        assert!(config.factors.consumption.exchange_rate.is_some());
    }
}

//! Deployment settings read from environment variables.
//!
//! Values are expected in the process environment or a `.env` file loaded by
//! `main`. Every setting has a default suitable for local development.

use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/ecotrack.sqlite?mode=rwc";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Settings that vary between deployments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// `SeaORM` connection string (`DATABASE_URL`)
    pub database_url: String,
    /// Socket address the HTTP server binds (`BIND_ADDRESS`)
    pub bind_address: String,
    /// Location of config.toml (`ECOTRACK_CONFIG`)
    pub config_path: PathBuf,
}

impl ServerSettings {
    /// Reads settings from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_address: lookup("BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            config_path: lookup("ECOTRACK_CONFIG")
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from),
        }
    }
}

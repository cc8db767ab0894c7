//! Configuration for the ledger host

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding one sub-directory per world
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// World the ledger binds to at startup
    pub primary_world: String,

    /// Saved-data name; also the file stem inside the world directory
    pub data_name: String,

    /// Seconds between host flushes of dirty balances
    pub autosave_interval_secs: u64,

    /// Record Prometheus metrics for ledger operations
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/economy"),
            service_name: "balance-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            primary_world: "world".to_string(),
            data_name: "EconomyData".to_string(),
            autosave_interval_secs: 45,
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("ECONOMY_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(world) = std::env::var("ECONOMY_PRIMARY_WORLD") {
            config.primary_world = world;
        }

        if let Ok(secs) = std::env::var("ECONOMY_AUTOSAVE_SECS") {
            config.autosave_interval_secs = secs.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid ECONOMY_AUTOSAVE_SECS {:?}: {}", secs, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.autosave_interval_secs == 0 {
            return Err(crate::Error::Config(
                "autosave_interval_secs must be positive".to_string(),
            ));
        }
        if self.primary_world.is_empty() || self.data_name.is_empty() {
            return Err(crate::Error::Config(
                "primary_world and data_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

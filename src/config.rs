use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::STORAGE_KEY;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Single-table SQLite database at `data_path`
    Sqlite,
    /// One JSON file per key inside the `data_path` directory
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    #[serde(default = "default_wikipedia_api_url")]
    pub wikipedia_api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_nearby_radius_meters")]
    pub nearby_radius_meters: u32,
    #[serde(default = "default_nearby_limit")]
    pub nearby_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: default_storage_backend(),
            data_path: default_data_path(),
            storage_key: default_storage_key(),
            currency_symbol: default_currency_symbol(),
            log_level: default_log_level(),
            config_version: Some(CURRENT_CONFIG_VERSION),
            lookup: LookupConfig::default(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            nominatim_url: default_nominatim_url(),
            wikipedia_api_url: default_wikipedia_api_url(),
            timeout_secs: default_timeout_secs(),
            search_limit: default_search_limit(),
            nearby_radius_meters: default_nearby_radius_meters(),
            nearby_limit: default_nearby_limit(),
        }
    }
}

// Default value functions
fn default_storage_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_data_path() -> String {
    // Fallback only; the profile-specific path is applied at load time
    Config::default_data_path_for_profile(utils::Profile::Prod, StorageBackend::Sqlite)
}

fn default_storage_key() -> String {
    STORAGE_KEY.to_string()
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

fn default_user_agent() -> String {
    format!("tripsquad/{}", env!("CARGO_PKG_VERSION"))
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_wikipedia_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_search_limit() -> usize {
    8
}

fn default_nearby_radius_meters() -> u32 {
    8000
}

fn default_nearby_limit() -> usize {
    8
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and data paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            let mut config = Self::read_file(&config_path)?;
            // Keep dev and prod data apart even if the file was copied between profiles
            config.data_path = Self::default_data_path_for_profile(profile, config.storage_backend);
            Ok(config)
        } else {
            let mut config = Config::default();
            config.data_path = Self::default_data_path_for_profile(profile, config.storage_backend);
            if let Err(e) = config.save_to_path(&config_path) {
                tracing::error!(path = %config_path.display(), error = %e, "failed to save config file");
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Load an explicit config file (the `--config` flag). A missing file is an error
    /// here; `data_path` is taken from the file as written.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::read_file(path)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Default data location for a profile: `trips.db` for SQLite, a `data/` directory for files
    fn default_data_path_for_profile(profile: utils::Profile, backend: StorageBackend) -> String {
        let leaf = match backend {
            StorageBackend::Sqlite => "trips.db",
            StorageBackend::File => "data",
        };
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join(leaf).to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => format!("~/.local/share/tripsquad-dev/{}", leaf),
                utils::Profile::Prod => format!("~/.local/share/tripsquad/{}", leaf),
            }
        }
    }

    /// Get the expanded data path (with ~ expansion)
    pub fn get_data_path(&self) -> PathBuf {
        utils::expand_path(&self.data_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gets_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Sqlite);
        assert_eq!(config.storage_key, STORAGE_KEY);
        assert_eq!(config.currency_symbol, "₹");
        assert_eq!(config.lookup.search_limit, 8);
        assert_eq!(config.lookup.nearby_radius_meters, 8000);
        assert_eq!(config.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn partial_lookup_table_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            storage_backend = "file"
            currency_symbol = "$"

            [lookup]
            timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::File);
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.lookup.timeout_secs, 3);
        assert_eq!(
            config.lookup.wikipedia_api_url,
            "https://en.wikipedia.org/w/api.php"
        );
    }

    #[test]
    fn save_then_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let mut config = Config::default();
        config.data_path = "/tmp/trips-test.db".to_string();
        config.config_version = None;
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.data_path, "/tmp/trips-test.db");
        assert_eq!(loaded.config_version, Some(CURRENT_CONFIG_VERSION));
        assert_eq!(loaded.get_data_path(), PathBuf::from("/tmp/trips-test.db"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load_from_path(&dir.path().join("nope.toml")),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "storage_backend = \"floppy\"").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}

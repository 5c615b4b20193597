//! Adapter configuration and persistence utilities.
//!
//! The configuration is a JSON file in the platform config directory. A
//! missing file is not an error: defaults are used instead.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::Network;

/// Configuration error type.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Other configuration error.
    #[error("{0}")]
    Other(String),
}

/// Adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Label the extensions show when asking the user to authorize the app.
    #[serde(default = "default_app_label")]
    pub app_label: String,
    /// Network used when a connect request names none.
    #[serde(default)]
    pub default_network: Network,
    /// Extra WebSocket endpoints tried before the built-in ones.
    #[serde(default)]
    pub custom_endpoints: Vec<String>,
    /// Upper bound for one endpoint connection attempt.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
    /// How long a balance read is reused.
    #[serde(default = "default_balance_ttl_secs")]
    pub balance_ttl_secs: u64,
}

fn default_app_label() -> String {
    "dotconnect".to_string()
}

fn default_attempt_timeout_secs() -> u64 {
    15
}

fn default_balance_ttl_secs() -> u64 {
    10
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            app_label: default_app_label(),
            default_network: Network::Polkadot,
            custom_endpoints: Vec::new(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            balance_ttl_secs: default_balance_ttl_secs(),
        }
    }
}

impl AdapterConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn balance_ttl(&self) -> Duration {
        Duration::from_secs(self.balance_ttl_secs)
    }

    /// Add a custom endpoint. Does not add duplicates.
    pub fn add_custom_endpoint(&mut self, url: String) {
        if self.custom_endpoints.iter().any(|e| *e == url) {
            return;
        }
        self.custom_endpoints.push(url);
    }
}

// ==================== Path Utilities ====================

/// Get the config directory.
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("xyz", "dotconnect", "dotconnect")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| ConfigError::Other("Could not determine config directory".to_string()))
}

/// Get the config file path.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    get_config_dir().map(|dir| dir.join("config.json"))
}

// ==================== Config I/O ====================

/// Load configuration from the default location.
pub fn load_config() -> Result<AdapterConfig, ConfigError> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from a path, using defaults if the file does not exist.
pub fn load_config_from(path: &Path) -> Result<AdapterConfig, ConfigError> {
    if !path.exists() {
        return Ok(AdapterConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to the default location.
pub fn save_config(config: &AdapterConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path()?)
}

/// Save configuration to a path, creating parent directories.
pub fn save_config_to(config: &AdapterConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("dotconnect-test-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_default_config() {
        let config = AdapterConfig::default();
        assert_eq!(config.app_label, "dotconnect");
        assert_eq!(config.default_network, Network::Polkadot);
        assert_eq!(config.attempt_timeout(), Duration::from_secs(15));
        assert_eq!(config.balance_ttl(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AdapterConfig =
            serde_json::from_str(r#"{"default_network":"kusama"}"#).unwrap();
        assert_eq!(config.default_network, Network::Kusama);
        assert_eq!(config.attempt_timeout_secs, 15);
        assert!(config.custom_endpoints.is_empty());
    }

    #[test]
    fn test_add_custom_endpoint_no_duplicates() {
        let mut config = AdapterConfig::default();
        config.add_custom_endpoint("wss://a".into());
        config.add_custom_endpoint("wss://a".into());
        config.add_custom_endpoint("wss://b".into());
        assert_eq!(config.custom_endpoints, vec!["wss://a", "wss://b"]);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let path = temp_path("missing");
        let config = load_config_from(&path).unwrap();
        assert_eq!(config, AdapterConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save");
        let mut config = AdapterConfig {
            default_network: Network::Westend,
            ..Default::default()
        };
        config.add_custom_endpoint("wss://example.invalid".into());

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let path = temp_path("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Json(_))));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}

// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for loading configuration
//! from TOML files.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::models::Config;

/// Load and parse a TOML file.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if loading fails.
pub fn load_config(path: &Path) -> Result<Config> {
    load_toml(path).or_else(|e| {
        log::warn!("Failed to load config from {path:?}: {e}");
        log::warn!("Using default configuration.");
        Ok(Config::default())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.sync.max_concurrent, 6);
    }

    #[test]
    fn test_load_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client]\nretry_attempts = 5\n").unwrap();

        let config: Config = load_toml(&path).unwrap();
        assert_eq!(config.client.retry_attempts, 5);
    }
}

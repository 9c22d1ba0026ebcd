//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote API client behavior
    #[serde(default)]
    pub client: ClientConfig,

    /// Sync pass behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Storage locations
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.client.base_url.trim().is_empty() {
            return Err(AppError::validation("client.base_url is empty"));
        }
        if self.client.user_agent.trim().is_empty() {
            return Err(AppError::validation("client.user_agent is empty"));
        }
        if self.client.timeout_secs == 0 {
            return Err(AppError::validation("client.timeout_secs must be > 0"));
        }
        if self.client.retry_attempts == 0 {
            return Err(AppError::validation("client.retry_attempts must be > 0"));
        }
        if self.sync.max_concurrent == 0 {
            return Err(AppError::validation("sync.max_concurrent must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.sync.parent_weight) {
            return Err(AppError::validation("sync.parent_weight must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.sync.child_weight) {
            return Err(AppError::validation("sync.child_weight must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Remote API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the versioned document API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Total attempts per request (first try included)
    #[serde(default = "defaults::retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay between retry attempts in milliseconds
    #[serde(default = "defaults::retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Time-to-live for cached responses in seconds
    #[serde(default = "defaults::cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            retry_attempts: defaults::retry_attempts(),
            retry_base_delay_ms: defaults::retry_base_delay(),
            cache_ttl_secs: defaults::cache_ttl(),
        }
    }
}

/// Sync pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum concurrent per-title fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Fraction of a referenced title's word count allocated to a
    /// top-level agency, per reference
    #[serde(default = "defaults::parent_weight")]
    pub parent_weight: f64,

    /// Fraction allocated to a child agency, per reference
    #[serde(default = "defaults::child_weight")]
    pub child_weight: f64,

    /// Days of synthetic history generated on the fallback path
    #[serde(default = "defaults::fallback_history_days")]
    pub fallback_history_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            parent_weight: defaults::parent_weight(),
            child_weight: defaults::child_weight(),
            fallback_history_days: defaults::fallback_history_days(),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the local store
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Client defaults
    pub fn base_url() -> String {
        "https://www.ecfr.gov".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; regsync/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn retry_attempts() -> u32 {
        3
    }
    pub fn retry_base_delay() -> u64 {
        1000
    }
    pub fn cache_ttl() -> u64 {
        3600
    }

    // Sync defaults
    pub fn max_concurrent() -> usize {
        6
    }
    pub fn parent_weight() -> f64 {
        0.10
    }
    pub fn child_weight() -> f64 {
        0.05
    }
    pub fn fallback_history_days() -> u32 {
        30
    }

    // Storage defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
}

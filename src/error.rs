// src/error.rs

//! Unified error handling for the sync engine.

use std::fmt;

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Fetch still failing after all retry attempts
    #[error("fetch failed for {resource} after {attempts} attempts: {message}")]
    TransientFetch {
        resource: String,
        attempts: u32,
        message: String,
    },

    /// Catalog-level failure; the sync pass falls back to synthetic data
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Response body that cannot be interpreted
    #[error("malformed content from {resource}: {message}")]
    MalformedContent { resource: String, message: String },

    /// Store write failure, scoped to a single record
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a transient fetch error after retries are exhausted.
    pub fn transient_fetch(
        resource: impl Into<String>,
        attempts: u32,
        message: impl fmt::Display,
    ) -> Self {
        Self::TransientFetch {
            resource: resource.into(),
            attempts,
            message: message.to_string(),
        }
    }

    /// Create an upstream-unavailable error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    /// Create a malformed-content error for the offending resource.
    pub fn malformed(resource: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedContent {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

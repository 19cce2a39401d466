//! Error types for cache configuration
//!
//! Cache operations themselves are total; only loading configuration can fail.

use thiserror::Error;

// == Config Error Enum ==
/// Errors raised while loading or validating a [`crate::CacheConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for this schema
    #[error("Invalid configuration JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A field holds a value the cache cannot work with
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

// == Result Type Alias ==
/// Convenience Result type for configuration handling.
pub type Result<T> = std::result::Result<T, ConfigError>;

//! Configuration Module
//!
//! Construction parameters for the caches. Values are passed in by the
//! embedding process, typically deserialized from its own config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, Result};

/// Cache configuration parameters.
///
/// A `capacity` of `0` disables capacity eviction and a `ttl_ms` of `0`
/// disables expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Time-to-live in milliseconds for every entry
    pub ttl_ms: u64,
    /// Interval in milliseconds between background sweeps
    pub sweep_interval_ms: u64,
}

impl CacheConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    ///
    /// # Example
    /// ```
    /// use recency_cache::CacheConfig;
    ///
    /// let config = CacheConfig::from_json(r#"{"capacity": 64, "ttl_ms": 5000}"#).unwrap();
    /// assert_eq!(config.capacity, 64);
    /// assert_eq!(config.sweep_interval_ms, 1000);
    /// ```
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from signed values, e.g. ones read from a source that
    /// does not enforce non-negative numbers.
    ///
    /// Negative values are treated as `0`, which disables the corresponding
    /// bound.
    pub fn from_signed(capacity: i64, ttl_ms: i64) -> Self {
        if capacity < 0 {
            warn!(capacity, "negative cache capacity, treating as unbounded");
        }
        if ttl_ms < 0 {
            warn!(ttl_ms, "negative cache ttl, disabling expiry");
        }

        Self {
            capacity: usize::try_from(capacity).unwrap_or(0),
            ttl_ms: u64::try_from(ttl_ms).unwrap_or(0),
            ..Self::default()
        }
    }

    /// Checks values that would make the sweep task unusable.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "sweep_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_ms: 300_000,
            sweep_interval_ms: 1000,
        }
    }
}

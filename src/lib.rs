//! Recency Cache - an in-process bounded key/value cache
//!
//! Provides least-recently-used eviction with optional TTL expiration.
//!
//! ```
//! use std::time::Duration;
//! use recency_cache::ExpiringCache;
//!
//! let mut cache = ExpiringCache::new(2, Duration::from_secs(60));
//! cache.add("a", 1);
//! cache.add("b", 2);
//! cache.get("a");
//! cache.add("c", 3);
//!
//! assert_eq!(cache.get("b"), None);
//! assert_eq!(cache.len(), 2);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{BoundedRecencyCache, Cache, CacheStats, EvictionReason, ExpiringCache};
pub use config::CacheConfig;
pub use error::ConfigError;
pub use tasks::spawn_sweep_task;

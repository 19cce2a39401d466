//! Cache Module
//!
//! Provides an in-memory LRU cache and a TTL-aware wrapper around it.

mod entry;
mod expiring;
mod lru;
mod stats;


// Re-export public types
pub use expiring::ExpiringCache;
pub use lru::{BoundedRecencyCache, Iter};
pub use stats::CacheStats;

// == Eviction Reason ==
/// Why an entry left the cache without an explicit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// The cache went over capacity and this was the least recently used entry
    Capacity,
    /// The entry outlived the cache's TTL
    Expired,
}

// == Cache Trait ==
/// Operations shared by [`BoundedRecencyCache`] and [`ExpiringCache`].
pub trait Cache<K, V> {
    /// Inserts or refreshes `key`, marking it most recently used.
    fn add(&mut self, key: K, value: V);

    /// Returns the live value for `key`, marking it most recently used.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Removes `key`, returning its value if it was present.
    fn remove(&mut self, key: &K) -> Option<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

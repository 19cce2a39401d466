//! Cache Entry Module
//!
//! Defines the arena node that holds one cached pair, its creation time
//! and its position in the recency list.

use std::time::Duration;

#[cfg(test)]
use mock_instant::thread_local::Instant;
#[cfg(not(test))]
use std::time::Instant;

// == Arena Links ==
/// Index of a node inside the cache arena.
pub(crate) type NodeIndex = usize;

/// Sentinel for a missing neighbour.
pub(crate) const NULL_INDEX: NodeIndex = usize::MAX;

// == Cache Entry ==
/// A single cached pair threaded into the recency list.
///
/// `prev` points towards the most recently used end, `next` towards the
/// least recently used end.
#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    /// The cache key, kept so eviction from the tail can clean the index
    pub key: K,
    /// The stored value
    pub value: V,
    /// Insertion or last refresh time
    pub created_at: Instant,
    pub prev: NodeIndex,
    pub next: NodeIndex,
}

impl<K, V> Entry<K, V> {
    // == Constructor ==
    /// Creates an unlinked entry stamped with the current time.
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            created_at: Instant::now(),
            prev: NULL_INDEX,
            next: NULL_INDEX,
        }
    }

    // == Refresh ==
    /// Replaces the value and restarts the entry's clock.
    ///
    /// Returns the previous value.
    pub fn refresh(&mut self, value: V) -> V {
        self.created_at = Instant::now();
        std::mem::replace(&mut self.value, value)
    }

    // == Age ==
    /// Time elapsed since the entry was inserted or last refreshed.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    // == Is Expired ==
    /// Checks the entry against a TTL.
    ///
    /// A zero TTL never expires. Otherwise the entry is expired once its age
    /// reaches the TTL, so `created_at + ttl <= now` counts as expired.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        !ttl.is_zero() && self.age() >= ttl
    }

    // == Time To Live ==
    /// Remaining lifetime under `ttl`.
    ///
    /// Returns `None` when the TTL is disabled and `Some(Duration::ZERO)`
    /// once the entry has expired.
    pub fn ttl_remaining(&self, ttl: Duration) -> Option<Duration> {
        if ttl.is_zero() {
            return None;
        }
        Some(ttl.saturating_sub(self.age()))
    }
}

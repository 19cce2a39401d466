//! Expiring Cache Module
//!
//! Layers time-to-live expiration on top of [`BoundedRecencyCache`].

use std::borrow::Borrow;
use std::hash::Hash;
use std::time::Duration;

use tracing::debug;

use crate::cache::entry::NodeIndex;
use crate::cache::{BoundedRecencyCache, Cache, CacheStats, EvictionReason};
use crate::config::CacheConfig;

// == Expiring Cache ==
/// An LRU cache whose entries expire `ttl` after their last insert or refresh.
///
/// Expired entries are never returned. They are purged lazily when a `get`
/// touches them, or eagerly by [`remove_expired`](Self::remove_expired).
/// There is no background timer; schedule sweeps from the owning process if
/// needed (see [`crate::tasks::spawn_sweep_task`]).
///
/// Capacity eviction always takes the least recently used entry, even if a
/// more recently used entry has already expired. Recency wins over age.
#[derive(Debug)]
pub struct ExpiringCache<K, V> {
    inner: BoundedRecencyCache<K, V>,
    /// Zero disables expiry
    ttl: Duration,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries (`0` = unbounded)
    /// that expire after `ttl` (`Duration::ZERO` = never).
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: BoundedRecencyCache::new(capacity),
            ttl,
        }
    }

    /// Creates a cache from a loaded configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    /// See [`BoundedRecencyCache::set_eviction_listener`]. Expired entries
    /// arrive with [`EvictionReason::Expired`].
    pub fn set_eviction_listener<F>(&mut self, listener: F)
    where
        F: FnMut(K, V, EvictionReason) + Send + 'static,
    {
        self.inner.set_eviction_listener(listener);
    }

    // == Add ==
    /// Inserts or refreshes an entry. Refreshing restarts its expiry clock.
    pub fn add(&mut self, key: K, value: V) {
        self.inner.add(key, value);
    }

    // == Get ==
    /// Returns the value if present and not expired, marking it most recently
    /// used.
    ///
    /// An expired entry is removed as part of the read and reported as a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.live_index(key)?;
        self.inner.promote(idx);
        Some(&self.inner.node(idx).value)
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.live_index(key)?;
        self.inner.promote(idx);
        Some(&mut self.inner.node_mut(idx).value)
    }

    // == Peek ==
    /// Returns the value if present and not expired, without reordering or
    /// removing anything.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.inner.find(key)?;
        let entry = self.inner.node(idx);
        if entry.is_expired(self.ttl) {
            None
        } else {
            Some(&entry.value)
        }
    }

    // == Time To Live ==
    /// Remaining lifetime of a live entry.
    ///
    /// `None` if the key is absent or expired, or if expiry is disabled.
    pub fn time_to_live<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.inner.find(key)?;
        let entry = self.inner.node(idx);
        if entry.is_expired(self.ttl) {
            return None;
        }
        entry.ttl_remaining(self.ttl)
    }

    // == Remove Expired ==
    /// Sweeps the whole cache and drops every expired entry.
    ///
    /// Returns the number of entries removed. A no-op when expiry is disabled.
    pub fn remove_expired(&mut self) -> usize {
        if self.ttl.is_zero() {
            return 0;
        }

        let ttl = self.ttl;
        let expired: Vec<_> = self
            .inner
            .indices()
            .into_iter()
            .filter(|&idx| self.inner.node(idx).is_expired(ttl))
            .collect();

        let count = expired.len();
        for idx in expired {
            self.inner.evict(idx, EvictionReason::Expired);
        }

        if count > 0 {
            debug!(removed = count, remaining = self.inner.len(), "swept expired entries");
        }
        count
    }

    // == Remove ==

    /// Removes an entry and hands its value back.
    ///
    /// An expired entry is still removed, but counts as an expiration and is
    /// reported as absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.inner.find(key)?;
        self.take_live(idx).map(|(_, value)| value)
    }

    /// Removes the least recently used entry.
    ///
    /// If that entry has expired it is dropped as an expiration and `None`
    /// is returned.
    pub fn remove_oldest(&mut self) -> Option<(K, V)> {
        let idx = self.inner.oldest()?;
        self.take_live(idx)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Iterates over live entries from most to least recently used.
    ///
    /// Expired entries are skipped but stay stored until a read or sweep
    /// purges them.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let ttl = self.ttl;
        self.inner
            .nodes()
            .filter(move |entry| !entry.is_expired(ttl))
            .map(|entry| (&entry.key, &entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    // == Internal ==

    /// Unlinks `idx`, handing it back only if it has not expired.
    fn take_live(&mut self, idx: NodeIndex) -> Option<(K, V)> {
        if self.inner.node(idx).is_expired(self.ttl) {
            self.inner.evict(idx, EvictionReason::Expired);
            return None;
        }
        Some(self.inner.unlink(idx))
    }

    /// Resolves `key` to a node that has not expired, purging it if it has.
    /// Records the hit or miss.
    fn live_index<Q>(&mut self, key: &Q) -> Option<NodeIndex>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(idx) = self.inner.find(key) else {
            self.inner.stats_mut().record_miss();
            return None;
        };

        if self.inner.node(idx).is_expired(self.ttl) {
            self.inner.evict(idx, EvictionReason::Expired);
            self.inner.stats_mut().record_miss();
            return None;
        }

        self.inner.stats_mut().record_hit();
        Some(idx)
    }
}

impl<K, V> Cache<K, V> for ExpiringCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn add(&mut self, key: K, value: V) {
        ExpiringCache::add(self, key, value);
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        ExpiringCache::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        ExpiringCache::remove(self, key)
    }

    fn len(&self) -> usize {
        ExpiringCache::len(self)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use mock_instant::thread_local::MockClock;
    use std::sync::{Arc, Mutex};

    const TTL: Duration = Duration::from_millis(1000);

    #[test]
    fn test_get_hit() {
        let mut cache = ExpiringCache::new(0, Duration::ZERO);
        cache.add("myKey", 1234);

        assert_eq!(cache.get("myKey"), Some(&1234));
    }

    #[test]
    fn test_get_miss() {
        let mut cache = ExpiringCache::new(0, Duration::ZERO);
        cache.add("myKey", 1234);

        assert_eq!(cache.get("nonsense"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_expired_removes_entry() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("myKey", 1234);

        MockClock::advance(Duration::from_millis(1100));

        assert_eq!(cache.get("myKey"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let mut cache = ExpiringCache::new(0, Duration::ZERO);
        cache.add("myKey", 1234);

        MockClock::advance(Duration::from_secs(60 * 60 * 24 * 365 * 10));

        assert_eq!(cache.get("myKey"), Some(&1234));
        assert_eq!(cache.remove_expired(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("k", 1);

        MockClock::advance(TTL - Duration::from_millis(1));
        assert_eq!(cache.peek("k"), Some(&1));

        MockClock::advance(Duration::from_millis(1));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_remove_expired_without_reads() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("myKey", 1234);
        assert_eq!(cache.get("myKey"), Some(&1234));

        MockClock::advance(TTL);

        assert_eq!(cache.remove_expired(), 1);
        assert_eq!(cache.len(), 0, "Cache still contains expired entry");
    }

    #[test]
    fn test_remove_expired_keeps_live_entries_in_order() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("old1", 1);
        cache.add("old2", 2);

        MockClock::advance(Duration::from_millis(600));
        cache.add("new1", 3);
        cache.add("new2", 4);

        MockClock::advance(Duration::from_millis(600));

        assert_eq!(cache.remove_expired(), 2);
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec!["new2", "new1"]);
    }

    #[test]
    fn test_refresh_resets_expiry() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("k", "v1");

        MockClock::advance(TTL / 2);
        cache.add("k", "v2");

        MockClock::advance(TTL / 2 + Duration::from_millis(1));

        assert_eq!(cache.get("k"), Some(&"v2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_does_not_reset_expiry() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("k", 1);

        MockClock::advance(Duration::from_millis(900));
        assert_eq!(cache.get("k"), Some(&1));

        MockClock::advance(Duration::from_millis(100));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_capacity_eviction_prefers_recency_over_age() {
        let mut cache = ExpiringCache::new(2, TTL);
        cache.add("a", 1);

        MockClock::advance(Duration::from_millis(500));
        cache.add("b", 2);

        // Reading "a" moves it ahead of "b" without restarting its clock
        MockClock::advance(Duration::from_millis(400));
        assert_eq!(cache.get("a"), Some(&1));

        // "a" is now expired, "b" is still live but least recently used
        MockClock::advance(Duration::from_millis(200));
        cache.add("c", 3);

        assert!(cache.peek("b").is_none());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        // The expired entry survives until it is read
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("c"), Some(&3));
    }

    #[test]
    fn test_peek_does_not_remove_expired() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("k", 1);

        MockClock::advance(TTL * 2);

        assert_eq!(cache.peek("k"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_time_to_live() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("k", 1);

        MockClock::advance(Duration::from_millis(250));
        assert_eq!(cache.time_to_live("k"), Some(Duration::from_millis(750)));
        assert_eq!(cache.time_to_live("missing"), None);

        MockClock::advance(Duration::from_millis(750));
        assert_eq!(cache.time_to_live("k"), None);

        let mut forever = ExpiringCache::new(0, Duration::ZERO);
        forever.add("k", 1);
        assert_eq!(forever.time_to_live("k"), None);
    }

    #[test]
    fn test_get_mut_on_live_entry() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("k", vec![1]);

        if let Some(list) = cache.get_mut("k") {
            list.push(2);
        }
        assert_eq!(cache.peek("k"), Some(&vec![1, 2]));

        MockClock::advance(TTL);
        assert!(cache.get_mut("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_idempotent_remove() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("a", 1);
        cache.add("b", 2);

        assert_eq!(cache.remove("missing"), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek("a"), Some(&1));
        assert_eq!(cache.peek("b"), Some(&2));
    }

    #[test]
    fn test_remove_oldest_drops_expired_tail() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("a", 1);

        MockClock::advance(Duration::from_millis(600));
        cache.add("b", 2);

        MockClock::advance(Duration::from_millis(500));

        assert_eq!(cache.remove_oldest(), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.remove_oldest(), Some(("b", 2)));
        assert_eq!(cache.remove_oldest(), None);
    }

    #[test]
    fn test_remove_does_not_return_expired_value() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("k", 1234);
        cache.add("live", 1);

        MockClock::advance(Duration::from_millis(1100));
        cache.add("live", 2);

        assert_eq!(cache.remove("k"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.remove("live"), Some(2));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_iter_skips_expired_entries() {
        let mut cache = ExpiringCache::new(0, TTL);
        cache.add("k", 1234);

        MockClock::advance(Duration::from_millis(1100));

        assert_eq!(cache.iter().count(), 0);
        assert_eq!(cache.keys().count(), 0);
        assert_eq!(cache.len(), 1);

        cache.add("fresh", 1);
        assert_eq!(cache.iter().collect::<Vec<_>>(), vec![(&"fresh", &1)]);
    }

    #[test]
    fn test_listener_reasons() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut cache: ExpiringCache<&'static str, i32> = ExpiringCache::new(2, TTL);
        cache.set_eviction_listener(move |key, _value, reason| {
            sink.lock().unwrap().push((key, reason));
        });

        cache.add("a", 1);
        cache.add("b", 2);
        cache.add("c", 3);

        MockClock::advance(TTL);
        cache.get("b");
        cache.remove_expired();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("a", EvictionReason::Capacity),
                ("b", EvictionReason::Expired),
                ("c", EvictionReason::Expired),
            ]
        );
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            capacity: 3,
            ttl_ms: 250,
            ..CacheConfig::default()
        };
        let cache: ExpiringCache<String, String> = ExpiringCache::from_config(&config);

        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.ttl(), Duration::from_millis(250));
    }
}

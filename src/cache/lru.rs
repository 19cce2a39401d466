//! Bounded Recency Cache Module
//!
//! Implements a least-recently-used cache as a hash index threaded through an
//! arena-backed doubly-linked list, giving O(1) amortized add, get and remove.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::cache::entry::{Entry, NodeIndex, NULL_INDEX};
use crate::cache::{Cache, CacheStats, EvictionReason};

/// Callback receiving entries removed by policy.
pub(crate) type EvictionListener<K, V> = Box<dyn FnMut(K, V, EvictionReason) + Send>;

// == Bounded Recency Cache ==
/// A key/value cache holding at most `capacity` entries, ordered by recency.
///
/// The list head is the most recently used entry and the tail the least
/// recently used one. A capacity of `0` disables capacity eviction; growth
/// must then be bounded by the caller.
///
/// Not synchronized: share it behind a lock if more than one task needs it.
pub struct BoundedRecencyCache<K, V> {
    /// Node storage; vacant slots are recycled through `free_list`
    slots: Vec<Option<Entry<K, V>>>,
    free_list: Vec<NodeIndex>,
    /// Key to node mapping
    index: HashMap<K, NodeIndex>,
    /// Most recently used node
    head: NodeIndex,
    /// Least recently used node
    tail: NodeIndex,
    capacity: usize,
    stats: CacheStats,
    listener: Option<EvictionListener<K, V>>,
}

impl<K, V> BoundedRecencyCache<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty cache. A `capacity` of `0` means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: NULL_INDEX,
            tail: NULL_INDEX,
            capacity,
            stats: CacheStats::new(),
            listener: None,
        }
    }

    /// Creates a cache with capacity eviction disabled.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    // == Eviction Listener ==
    /// Registers a callback for entries removed by capacity or expiry.
    ///
    /// Explicit removals (`remove`, `remove_oldest`, `clear`) do not reach
    /// the listener.
    pub fn set_eviction_listener<F>(&mut self, listener: F)
    where
        F: FnMut(K, V, EvictionReason) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    // == Add ==
    /// Inserts or refreshes an entry and marks it most recently used.
    ///
    /// An existing key keeps its slot: the value is replaced and the creation
    /// time restamped. A new key may push the cache over capacity, in which
    /// case the least recently used entry is evicted.
    pub fn add(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            self.node_mut(idx).refresh(value);
            self.promote(idx);
            return;
        }

        let idx = self.alloc(Entry::new(key.clone(), value));
        self.index.insert(key, idx);
        self.push_head(idx);

        if self.capacity > 0 && self.index.len() > self.capacity {
            let tail = self.tail;
            self.evict(tail, EvictionReason::Capacity);
        }
    }

    // == Get ==
    /// Looks up a value and marks it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.find(key) {
            Some(idx) => {
                self.stats.record_hit();
                self.promote(idx);
                Some(&self.node(idx).value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.find(key) {
            Some(idx) => {
                self.stats.record_hit();
                self.promote(idx);
                Some(&mut self.node_mut(idx).value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Peek ==
    /// Looks up a value without touching the recency order or statistics.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(|idx| &self.node(idx).value)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    // == Remove ==
    /// Removes an entry and hands its value back. Absent keys are a no-op.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.find(key)?;
        let (_, value) = self.unlink(idx);
        Some(value)
    }

    // == Remove Oldest ==
    /// Removes the least recently used entry. Returns `None` on an empty cache.
    pub fn remove_oldest(&mut self) -> Option<(K, V)> {
        if self.tail == NULL_INDEX {
            return None;
        }
        let tail = self.tail;
        Some(self.unlink(tail))
    }

    // == Clear ==
    /// Drops every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.index.clear();
        self.head = NULL_INDEX;
        self.tail = NULL_INDEX;
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of entries, `0` when unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Iteration ==
    /// Iterates over entries from most to least recently used.
    ///
    /// Does not change the recency order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            cache: self,
            cursor: self.head,
            remaining: self.index.len(),
        }
    }

    /// Iterates over keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.index.len());
        stats
    }

    // == Internal Contract ==
    // Used by the expiring layer to check an entry before the recency list
    // is touched, and to remove it without a second lookup.

    /// Locates a live node without reordering.
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<NodeIndex>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).copied()
    }

    /// Borrows the live node at `idx`.
    pub(crate) fn node(&self, idx: NodeIndex) -> &Entry<K, V> {
        self.slots[idx]
            .as_ref()
            .expect("recency index points at a vacant slot")
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIndex) -> &mut Entry<K, V> {
        self.slots[idx]
            .as_mut()
            .expect("recency index points at a vacant slot")
    }

    /// Walks live nodes from most to least recently used.
    pub(crate) fn nodes(&self) -> impl Iterator<Item = &Entry<K, V>> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NULL_INDEX {
                return None;
            }
            let node = self.node(cursor);
            cursor = node.next;
            Some(node)
        })
    }

    /// Least recently used node, if any.
    pub(crate) fn oldest(&self) -> Option<NodeIndex> {
        (self.tail != NULL_INDEX).then_some(self.tail)
    }

    /// Indices of every live node, most recently used first.
    pub(crate) fn indices(&self) -> Vec<NodeIndex> {
        let mut out = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while cursor != NULL_INDEX {
            out.push(cursor);
            cursor = self.node(cursor).next;
        }
        out
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    /// Moves a live node to the head of the recency list.
    pub(crate) fn promote(&mut self, idx: NodeIndex) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.push_head(idx);
    }

    /// Unlinks a node from the list and the index, freeing its slot.
    ///
    /// Every removal path goes through here so the index and the list never
    /// disagree once a public operation returns.
    pub(crate) fn unlink(&mut self, idx: NodeIndex) -> (K, V) {
        self.detach(idx);
        let entry = self.slots[idx]
            .take()
            .expect("recency index points at a vacant slot");
        self.index.remove(&entry.key);
        self.free_list.push(idx);
        (entry.key, entry.value)
    }

    /// Removes a node by policy, updating statistics and notifying the
    /// listener.
    pub(crate) fn evict(&mut self, idx: NodeIndex, reason: EvictionReason) {
        let (key, value) = self.unlink(idx);
        match reason {
            EvictionReason::Capacity => {
                self.stats.record_eviction();
                debug!(capacity = self.capacity, "evicted least recently used entry");
            }
            EvictionReason::Expired => {
                self.stats.record_expiration();
                debug!("dropped expired entry");
            }
        }
        if let Some(listener) = self.listener.as_mut() {
            listener(key, value, reason);
        }
    }

    // == Internal: Arena ==

    fn alloc(&mut self, entry: Entry<K, V>) -> NodeIndex {
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(entry);
            idx
        } else {
            self.slots.push(Some(entry));
            self.slots.len() - 1
        }
    }

    // == Internal: Linked List ==

    fn detach(&mut self, idx: NodeIndex) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        if prev != NULL_INDEX {
            self.node_mut(prev).next = next;
        } else {
            self.head = next;
        }

        if next != NULL_INDEX {
            self.node_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }

        let node = self.node_mut(idx);
        node.prev = NULL_INDEX;
        node.next = NULL_INDEX;
    }

    fn push_head(&mut self, idx: NodeIndex) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = NULL_INDEX;
            node.next = old_head;
        }

        if old_head != NULL_INDEX {
            self.node_mut(old_head).prev = idx;
        }
        self.head = idx;

        if self.tail == NULL_INDEX {
            self.tail = idx;
        }
    }
}

impl<K, V> Default for BoundedRecencyCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<K, V> fmt::Debug for BoundedRecencyCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedRecencyCache")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .field("stats", &self.stats)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl<K, V> Cache<K, V> for BoundedRecencyCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn add(&mut self, key: K, value: V) {
        BoundedRecencyCache::add(self, key, value);
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        BoundedRecencyCache::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        BoundedRecencyCache::remove(self, key)
    }

    fn len(&self) -> usize {
        BoundedRecencyCache::len(self)
    }
}

// == Iterator ==
/// Iterator over `(key, value)` pairs in recency order.
pub struct Iter<'a, K, V> {
    cache: &'a BoundedRecencyCache<K, V>,
    cursor: NodeIndex,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: Hash + Eq + Clone,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NULL_INDEX {
            return None;
        }
        let node = self.cache.node(self.cursor);
        self.cursor = node.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

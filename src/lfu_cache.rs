//! Least-frequently-used cache with frequency aging.
//!
//! Entries are grouped in buckets keyed by access count; each bucket is an
//! intrusive list, so ties at the same frequency are broken by recency. When
//! the average access count climbs above `average_ceiling`, every count is
//! halved so that formerly hot keys can be evicted again.
//!
//! ```text
//!   min_frequency = 1
//!        │
//!        ▼
//!   freq=1: head ─► [c] ◄──► [b] ◄── tail   (b is evicted first)
//!   freq=3: head ─► [a] ◄── tail
//! ```

use crate::list::{Arena, Entry, EntryId, IntrusiveList};
use crate::lru_cache::MAX_PREALLOC;
use crate::policy::Cache;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use tracing::{debug, trace};

/// Average access count above which an aging pass runs.
pub const DEFAULT_AVERAGE_CEILING: u64 = 10;

#[derive(Debug)]
pub(crate) struct LfuCore<K, V> {
    capacity: usize,
    average_ceiling: u64,
    arena: Arena<K, V>,
    map: FxHashMap<K, EntryId>,
    buckets: FxHashMap<u64, IntrusiveList>,
    min_frequency: Option<u64>,
    total_frequency: u64,
}

impl<K, V> LfuCore<K, V>
where
    K: Clone + Hash + Eq,
{
    pub(crate) fn new(capacity: usize, average_ceiling: u64) -> Self {
        let prealloc = capacity.min(MAX_PREALLOC);
        let mut map = FxHashMap::default();
        map.reserve(prealloc);
        Self {
            capacity,
            average_ceiling,
            arena: Arena::with_capacity(prealloc),
            map,
            buckets: FxHashMap::default(),
            min_frequency: None,
            total_frequency: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn average_ceiling(&self) -> u64 {
        self.average_ceiling
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    pub(crate) fn frequency(&self, key: &K) -> Option<u64> {
        let id = *self.map.get(key)?;
        self.arena.get(id).map(|entry| entry.access_count)
    }

    /// Records an access to `key` and returns its entry.
    pub(crate) fn touch(&mut self, key: &K) -> Option<&Entry<K, V>> {
        let id = *self.map.get(key)?;
        self.bump(id);
        self.age_if_needed();
        self.arena.get(id)
    }

    /// Inserts or updates `key`, returning the entry evicted to make room.
    pub(crate) fn put(&mut self, key: K, value: V) -> Option<Entry<K, V>> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&id) = self.map.get(&key) {
            if let Some(entry) = self.arena.get_mut(id) {
                entry.value = value;
            }
            self.bump(id);
            self.age_if_needed();
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            self.evict_inner(false)
        } else {
            None
        };

        let id = self.arena.insert(Entry::new(key.clone(), value));
        self.map.insert(key, id);
        self.link(id);
        self.total_frequency += 1;
        self.min_frequency = Some(1);
        self.age_if_needed();
        evicted
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let id = *self.map.get(key)?;
        let entry = self.detach(id, true)?;
        self.age_if_needed();
        Some(entry.value)
    }

    /// Evicts the least recently touched entry of the lowest frequency.
    pub(crate) fn evict(&mut self) -> Option<Entry<K, V>> {
        self.evict_inner(true)
    }

    fn evict_inner(&mut self, refresh_min: bool) -> Option<Entry<K, V>> {
        let min = self.min_frequency?;
        let id = self.buckets.get(&min)?.peek_back(&self.arena)?;
        let entry = self.detach(id, refresh_min)?;
        trace!(
            frequency = entry.access_count,
            capacity = self.capacity,
            "lfu evicted least frequently used entry"
        );
        Some(entry)
    }

    pub(crate) fn increase_capacity(&mut self) {
        self.capacity += 1;
    }

    /// Shrinks the capacity by one, evicting first when the cache is at or
    /// above the new bound. A no-op at zero capacity.
    pub(crate) fn decrease_capacity(&mut self) -> Option<Entry<K, V>> {
        if self.capacity == 0 {
            return None;
        }
        self.capacity -= 1;
        if self.map.len() >= self.capacity {
            self.evict()
        } else {
            None
        }
    }

    /// Sets the capacity, evicting until the cache fits.
    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.map.len() > self.capacity {
            if self.evict().is_none() {
                break;
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.buckets.clear();
        self.arena.clear();
        self.min_frequency = None;
        self.total_frequency = 0;
    }

    // Links a detached entry at the front of the bucket for its access count
    fn link(&mut self, id: EntryId) {
        let Some(freq) = self.arena.get(id).map(|entry| entry.access_count) else {
            return;
        };
        self.buckets
            .entry(freq)
            .or_insert_with(|| IntrusiveList::new(&mut self.arena))
            .insert_front(&mut self.arena, id);
    }

    // Unlinks an entry from its bucket; returns true if the bucket vanished
    fn unlink(&mut self, id: EntryId, freq: u64) -> bool {
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return false;
        };
        bucket.remove(&mut self.arena, id);
        if !bucket.is_empty(&self.arena) {
            return false;
        }
        if let Some(bucket) = self.buckets.remove(&freq) {
            bucket.release(&mut self.arena);
        }
        true
    }

    fn bump(&mut self, id: EntryId) {
        let Some(old) = self.arena.get(id).map(|entry| entry.access_count) else {
            return;
        };
        let vanished = self.unlink(id, old);
        if let Some(entry) = self.arena.get_mut(id) {
            entry.access_count += 1;
        }
        self.link(id);
        self.total_frequency += 1;
        if vanished && self.min_frequency == Some(old) {
            self.min_frequency = Some(old + 1);
        }
    }

    fn detach(&mut self, id: EntryId, refresh_min: bool) -> Option<Entry<K, V>> {
        let freq = self.arena.get(id)?.access_count;
        let vanished = self.unlink(id, freq);
        let entry = self.arena.remove(id)?;
        self.map.remove(&entry.key);
        self.total_frequency = self.total_frequency.saturating_sub(entry.access_count);

        if self.map.is_empty() {
            self.min_frequency = None;
        } else if refresh_min && vanished && self.min_frequency == Some(freq) {
            self.min_frequency = self.buckets.keys().min().copied();
        }
        Some(entry)
    }

    fn age_if_needed(&mut self) {
        let average = match self.map.len() as u64 {
            0 => 0,
            len => self.total_frequency / len,
        };
        if average > self.average_ceiling {
            self.age(average);
        }
    }

    // Halves every access count (floor, minimum 1) and rebuilds the buckets.
    // Old buckets are drained coldest first, back to front, so relative
    // recency survives inside each new bucket.
    fn age(&mut self, average: u64) {
        let mut old: Vec<(u64, IntrusiveList)> = self.buckets.drain().collect();
        old.sort_unstable_by_key(|(freq, _)| *freq);

        let mut min = None;
        let mut total = 0;
        for (_, mut list) in old {
            while let Some(id) = list.pop_back(&mut self.arena) {
                let Some(entry) = self.arena.get_mut(id) else {
                    continue;
                };
                entry.access_count = (entry.access_count / 2).max(1);
                let count = entry.access_count;
                total += count;
                min = Some(min.map_or(count, |m: u64| m.min(count)));
                self.link(id);
            }
            list.release(&mut self.arena);
        }

        debug!(
            average,
            ceiling = self.average_ceiling,
            before = self.total_frequency,
            after = total,
            "lfu aging pass halved access counts"
        );
        self.total_frequency = total;
        self.min_frequency = min;
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut linked = 0;
        let mut total = 0;
        for (&freq, bucket) in &self.buckets {
            assert!(!bucket.is_empty(&self.arena), "empty bucket {freq} kept");
            for id in bucket.ids(&self.arena) {
                let entry = self.arena.get(id).unwrap();
                assert_eq!(entry.access_count, freq);
                assert_eq!(self.map.get(&entry.key), Some(&id));
                linked += 1;
                total += freq;
            }
        }
        assert_eq!(linked, self.map.len());
        assert_eq!(self.arena.len(), self.map.len());
        assert_eq!(total, self.total_frequency);
        assert!(self.map.len() <= self.capacity);
        assert_eq!(self.min_frequency, self.buckets.keys().min().copied());
    }
}

impl<K, V> LfuCore<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    pub(crate) fn get(&mut self, key: &K) -> Option<V> {
        self.touch(key).map(|entry| entry.value.clone())
    }
}

/// A thread-safe LFU cache with periodic frequency aging.
///
/// # Examples
///
/// ```rust
/// use policy_cache::{Cache, LfuCache};
///
/// let cache = LfuCache::new(2);
/// cache.put(1, "a");
/// cache.put(2, "b");
/// cache.get(&1);
/// cache.put(3, "c");
/// // key 2 had the lowest frequency
/// assert_eq!(cache.get(&2), None);
/// assert_eq!(cache.get(&1), Some("a"));
/// ```
pub struct LfuCache<K, V> {
    inner: Mutex<LfuCore<K, V>>,
}

impl<K, V> LfuCache<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    /// Creates an LFU cache using [`DEFAULT_AVERAGE_CEILING`].
    pub fn new(capacity: usize) -> Self {
        Self::with_average_ceiling(capacity, DEFAULT_AVERAGE_CEILING)
    }

    pub fn with_average_ceiling(capacity: usize, average_ceiling: u64) -> Self {
        Self {
            inner: Mutex::new(LfuCore::new(capacity, average_ceiling)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn average_ceiling(&self) -> u64 {
        self.inner.lock().average_ceiling()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Current access count of `key`, without recording an access.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.inner.lock().frequency(key)
    }
}

impl<K, V> Cache<K, V> for LfuCache<K, V>
where
    K: Clone + Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key)
    }

    fn put(&self, key: K, value: V) -> bool {
        let mut inner = self.inner.lock();
        if inner.capacity() == 0 {
            return false;
        }
        inner.put(key, value);
        true
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    fn clear(&self) {
        self.inner.lock().clear();
    }
}

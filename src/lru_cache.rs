use crate::list::{Arena, Entry, EntryId, IntrusiveList};
use crate::policy::Cache;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use tracing::trace;

// Upper bound on eager map/arena allocation at construction
pub(crate) const MAX_PREALLOC: usize = 4096;

/// Unsynchronized LRU bookkeeping shared by every recency-based cache.
///
/// Callers hold their own lock around it. The ARC controller also resizes it
/// at runtime, which is why `capacity` is mutable here.
#[derive(Debug)]
pub(crate) struct LruCore<K, V> {
    capacity: usize,
    arena: Arena<K, V>,
    list: IntrusiveList,
    map: FxHashMap<K, EntryId>,
}

impl<K, V> LruCore<K, V>
where
    K: Clone + Hash + Eq,
{
    pub(crate) fn new(capacity: usize) -> Self {
        let prealloc = capacity.min(MAX_PREALLOC);
        let mut arena = Arena::with_capacity(prealloc + 2);
        let list = IntrusiveList::new(&mut arena);
        let mut map = FxHashMap::default();
        map.reserve(prealloc);
        Self {
            capacity,
            arena,
            list,
            map,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the entry for `key` without touching its recency.
    pub(crate) fn peek(&self, key: &K) -> Option<&Entry<K, V>> {
        self.map.get(key).and_then(|&id| self.arena.get(id))
    }

    /// Marks `key` as most recently used and returns its entry.
    pub(crate) fn touch(&mut self, key: &K) -> Option<&Entry<K, V>> {
        let id = *self.map.get(key)?;
        self.list.move_to_front(&mut self.arena, id);
        let entry = self.arena.get_mut(id)?;
        entry.access_count += 1;
        Some(&*entry)
    }

    /// Inserts or updates `key`.
    ///
    /// Returns the entry evicted to make room, if any. With zero capacity the
    /// write is dropped.
    pub(crate) fn put(&mut self, key: K, value: V) -> Option<Entry<K, V>> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&id) = self.map.get(&key) {
            if let Some(entry) = self.arena.get_mut(id) {
                entry.value = value;
                entry.access_count += 1;
            }
            self.list.move_to_front(&mut self.arena, id);
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        let id = self.arena.insert(Entry::new(key.clone(), value));
        self.list.insert_front(&mut self.arena, id);
        self.map.insert(key, id);
        evicted
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.map.remove(key)?;
        self.list.remove(&mut self.arena, id);
        self.arena.remove(id).map(|entry| entry.value)
    }

    /// Removes the least recently used entry.
    pub(crate) fn evict(&mut self) -> Option<Entry<K, V>> {
        let id = self.list.pop_back(&mut self.arena)?;
        let entry = self.arena.remove(id)?;
        self.map.remove(&entry.key);
        trace!(capacity = self.capacity, "lru evicted least recently used entry");
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

    /// Drops every entry; the capacity is kept.
    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.arena.clear();
        self.list = IntrusiveList::new(&mut self.arena);
    }

    /// Sets the capacity, evicting from the back until the cache fits.
    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.map.len() > self.capacity {
            if self.evict().is_none() {
                break;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn keys_mru_first(&self) -> Vec<K> {
        self.list
            .ids(&self.arena)
            .filter_map(|id| self.arena.get(id).map(|entry| entry.key.clone()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.map.len(), self.list.len());
        assert_eq!(self.map.len(), self.arena.len());
        assert!(self.map.len() <= self.capacity);
        for (key, &id) in &self.map {
            assert!(self.arena.get(id).is_some_and(|entry| &entry.key == key));
        }
    }
}

impl<K, V> LruCore<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    pub(crate) fn get(&mut self, key: &K) -> Option<V> {
        self.touch(key).map(|entry| entry.value.clone())
    }
}

/// A thread-safe LRU cache.
///
/// A hash map gives O(1) lookups and an intrusive list, stored in an index
/// arena, keeps recency order. One mutex guards every operation.
///
/// A cache built with capacity 0 rejects every write and misses every read.
///
/// # Examples
///
/// ```rust
/// use policy_cache::{Cache, LruCache};
///
/// let cache = LruCache::new(2);
/// cache.put("key1".to_string(), "value1".to_string());
/// assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
/// ```
pub struct LruCache<K, V> {
    inner: Mutex<LruCore<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Returns true if `key` is cached, without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_basic_operations() {
        let cache = LruCache::new(2);

        assert!(cache.put("key1".to_string(), "one".to_string()));
        assert!(cache.put("key2".to_string(), "two".to_string()));

        assert_eq!(cache.get(&"key1".to_string()), Some("one".to_string()));
        assert_eq!(cache.get(&"key2".to_string()), Some("two".to_string()));

        // Verify capacity limit
        cache.put("key3".to_string(), "three".to_string());
        assert!(cache.len() <= cache.capacity());

        // Verify LRU behavior
        assert_eq!(cache.get(&"key1".to_string()), None);
        assert_eq!(cache.get(&"key2".to_string()), Some("two".to_string()));
        assert_eq!(cache.get(&"key3".to_string()), Some("three".to_string()));
    }

    #[test]
    fn test_first_inserted_key_is_evicted() {
        let cache = LruCache::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.get(&3), Some("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = LruCache::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        assert_eq!(cache.get(&1), Some("a"));
        cache.put(3, "c");

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
    }

    #[test]
    fn test_update_existing() {
        let cache = LruCache::new(2);

        cache.put("key1".to_string(), "one".to_string());
        cache.put("key2".to_string(), "two".to_string());
        cache.put("key1".to_string(), "new_one".to_string());
        assert_eq!(cache.len(), 2);

        // key1 was refreshed by the update, so key2 goes first
        cache.put("key3".to_string(), "three".to_string());
        assert_eq!(cache.get(&"key1".to_string()), Some("new_one".to_string()));
        assert_eq!(cache.get(&"key2".to_string()), None);
    }

    #[test]
    fn test_remove() {
        let cache = LruCache::new(2);
        cache.put(1, "a");
        assert_eq!(cache.remove(&1), Some("a"));
        assert_eq!(cache.remove(&1), None);
        assert_eq!(cache.get(&1), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_rejects_writes() {
        let cache = LruCache::new(0);
        assert!(!cache.put(1, "a"));
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.capacity(), 0);
    }

    #[test]
    fn test_clear() {
        let cache = LruCache::new(2);

        cache.put("key1".to_string(), "one".to_string());
        cache.put("key2".to_string(), "two".to_string());
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&"key1".to_string()), None);

        // Still usable after clearing
        cache.put("key3".to_string(), "three".to_string());
        assert_eq!(cache.get(&"key3".to_string()), Some("three".to_string()));
    }

    #[test]
    fn test_core_access_count_and_order() {
        let mut core = LruCore::new(3);
        core.put(1, 10);
        core.put(2, 20);
        core.put(3, 30);
        assert_eq!(core.touch(&1).map(|e| e.access_count), Some(2));
        core.put(1, 11);
        assert_eq!(core.touch(&1).map(|e| (e.value, e.access_count)), Some((11, 4)));
        assert_eq!(core.keys_mru_first(), vec![1, 3, 2]);
        core.assert_invariants();
    }

    #[test]
    fn test_core_put_reports_eviction() {
        let mut core = LruCore::new(1);
        assert!(core.put(1, "a").is_none());
        let evicted = core.put(2, "b").unwrap();
        assert_eq!((evicted.key, evicted.value), (1, "a"));
        core.assert_invariants();
    }

    #[test]
    fn test_core_capacity_changes() {
        let mut core = LruCore::new(2);
        core.put(1, "a");
        core.put(2, "b");

        let evicted = core.decrease_capacity().unwrap();
        assert_eq!(evicted.key, 1);
        assert_eq!(core.capacity(), 1);
        core.assert_invariants();

        core.increase_capacity();
        core.put(3, "c");
        assert_eq!(core.len(), 2);

        core.set_capacity(0);
        assert_eq!(core.len(), 0);
        assert!(core.decrease_capacity().is_none());
        assert_eq!(core.capacity(), 0);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(LruCache::new(100));
        let mut handles = vec![];

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..500 {
                    let key = (i * 1000 + j) % 300;
                    cache.put(key, j);
                    let _ = cache.get(&key);
                    if j % 7 == 0 {
                        cache.remove(&key);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= cache.capacity());
        cache.inner.lock().assert_invariants();
    }
}

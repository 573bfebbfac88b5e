use crate::lru_cache::LruCore;
use crate::policy::Cache;
use parking_lot::Mutex;
use std::hash::Hash;
use tracing::debug;

struct LruKState<K, V> {
    main: LruCore<K, V>,
    // Access counts of keys that have not been admitted yet
    history: LruCore<K, u64>,
}

impl<K, V> LruKState<K, V>
where
    K: Clone + Hash + Eq,
{
    fn record_access(&mut self, key: &K) -> u64 {
        let count = self.history.touch(key).map_or(0, |entry| entry.value) + 1;
        self.history.put(key.clone(), count);
        count
    }
}

/// An LRU cache that only admits keys seen at least `k` times.
///
/// Every access to a key that is not cached bumps a counter in a separate,
/// independently sized LRU history. A write is stored once the counter reaches
/// `k`; the history entry is dropped at that point. Reads never admit keys,
/// they only count. One-off writes therefore never push hot keys out.
///
/// Keys already resident in the main cache bypass the history: their writes
/// and reads go straight to the main cache.
///
/// # Examples
///
/// ```rust
/// use policy_cache::{Cache, LruKCache};
///
/// let cache = LruKCache::new(10, 40, 2);
/// assert!(!cache.put("page", 1));
/// assert_eq!(cache.get(&"page"), None);
/// assert!(cache.put("page", 1));
/// assert_eq!(cache.get(&"page"), Some(1));
/// ```
pub struct LruKCache<K, V> {
    inner: Mutex<LruKState<K, V>>,
    k: u64,
}

impl<K, V> LruKCache<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    /// Creates a cache holding `capacity` entries, remembering access counts
    /// for up to `history_capacity` candidate keys. A `k` of 0 behaves like 1.
    pub fn new(capacity: usize, history_capacity: usize, k: u64) -> Self {
        Self {
            inner: Mutex::new(LruKState {
                main: LruCore::new(capacity),
                history: LruCore::new(history_capacity),
            }),
            k: k.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().main.capacity()
    }

    pub fn history_capacity(&self) -> usize {
        self.inner.lock().history.capacity()
    }

    pub fn k(&self) -> u64 {
        self.k
    }

    /// Returns true if `key` has been admitted to the main cache.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().main.contains(key)
    }

    /// Pending access count of a key that has not been admitted yet.
    pub fn history_count(&self, key: &K) -> Option<u64> {
        self.inner.lock().history.peek(key).map(|entry| entry.value)
    }
}

impl<K, V> Cache<K, V> for LruKCache<K, V>
where
    K: Clone + Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        if !inner.main.contains(key) {
            inner.record_access(key);
        }
        inner.main.get(key)
    }

    fn put(&self, key: K, value: V) -> bool {
        let mut inner = self.inner.lock();
        if inner.main.capacity() == 0 {
            return false;
        }
        if inner.main.contains(&key) {
            inner.main.put(key, value);
            return true;
        }

        let count = inner.record_access(&key);
        if count < self.k {
            return false;
        }
        inner.history.remove(&key);
        inner.main.put(key, value);
        debug!(count, k = self.k, "lru-k admitted key to main cache");
        true
    }

    fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        inner.history.remove(key);
        inner.main.remove(key)
    }

    fn len(&self) -> usize {
        self.inner.lock().main.len()
    }

    fn capacity(&self) -> usize {
        self.inner.lock().main.capacity()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.main.clear();
        inner.history.clear();
    }
}

use super::policy::Cache;
use super::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::thread;
use tracing::debug;

// Used when the platform cannot report its parallelism
const FALLBACK_SHARDS: usize = 4;

/// A sharded LRU cache implementation for high-concurrency scenarios.
///
/// This implementation divides the key space into `N` independent LRU caches,
/// each protected by its own mutex, so that operations on different shards
/// never contend. Every shard holds `ceil(capacity / N)` entries.
///
/// # Type Parameters
///
/// * `K` - The type of keys used in the cache. Must implement `Clone + Hash + Eq + Send + 'static`
/// * `V` - The type of values stored in the cache. Must implement `Clone + Send + 'static`
///
/// # Examples
///
/// ```rust
/// use policy_cache::{Cache, ShardedLruCache};
///
/// let cache = ShardedLruCache::with_shards(1000, 4);
/// cache.put("key1".to_string(), "value1".to_string());
/// assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
/// assert_eq!(cache.num_shards(), 4);
/// ```
pub struct ShardedLruCache<K, V> {
    shards: Vec<LruCache<K, V>>,
    total_capacity: usize,
}

impl<K, V> ShardedLruCache<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    /// Creates a sharded cache with one shard per available CPU.
    pub fn new(capacity: usize) -> Self {
        Self::with_shards(capacity, 0)
    }

    /// Creates a sharded cache with `num_shards` shards.
    ///
    /// A shard count of 0 falls back to the available hardware parallelism.
    pub fn with_shards(capacity: usize, num_shards: usize) -> Self {
        let num_shards = if num_shards > 0 {
            num_shards
        } else {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(FALLBACK_SHARDS)
        };
        let shard_capacity = capacity.div_ceil(num_shards);

        debug!(capacity, num_shards, shard_capacity, "building sharded lru cache");

        let shards = (0..num_shards)
            .map(|_| LruCache::new(shard_capacity))
            .collect();

        Self {
            shards,
            total_capacity: capacity,
        }
    }

    /// Returns the total capacity of the cache.
    pub fn capacity(&self) -> usize {
        self.total_capacity
    }

    /// Returns the number of shards in the cache.
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Returns the shard a key is routed to. Depends on the key alone.
    pub fn shard_index(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: &K) -> &LruCache<K, V> {
        &self.shards[self.shard_index(key)]
    }
}

impl<K, V> ShardedLruCache<K, V>
where
    K: Clone + Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Returns the number of entries held by each shard.
    pub fn shard_lens(&self) -> Vec<usize> {
        self.shards.iter().map(|shard| shard.len()).collect()
    }
}

impl<K, V> Cache<K, V> for ShardedLruCache<K, V>
where
    K: Clone + Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        self.shard(key).get(key)
    }

    fn put(&self, key: K, value: V) -> bool {
        self.shard(&key).put(key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).remove(key)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    fn capacity(&self) -> usize {
        self.total_capacity
    }

    fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.is_empty())
    }

    fn clear(&self) {
        for shard in &self.shards {
            shard.clear();
        }
    }
}

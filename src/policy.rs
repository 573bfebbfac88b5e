use std::hash::Hash;

/// The core trait that defines the behavior of a cache implementation.
///
/// Every eviction policy in this crate implements it, so callers can hold a
/// `Box<dyn Cache<K, V>>` without committing to one heuristic.
///
/// # Type Parameters
///
/// * `K` - The type of keys used in the cache. Must implement `Clone + Hash + Eq + Send + 'static`
/// * `V` - The type of values stored in the cache. Must implement `Clone + Send + 'static`
pub trait Cache<K, V>: Send + Sync
where
    K: Clone + Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Retrieves a value from the cache by its key.
    ///
    /// A hit is recorded by the policy (recency, frequency or both) and the
    /// value is cloned out.
    ///
    /// # Returns
    ///
    /// * `Some(V)` if the key exists
    /// * `None` if the key doesn't exist
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts a key-value pair into the cache.
    ///
    /// If the key already exists its value is replaced. If the cache is at
    /// capacity the policy evicts one entry to make space.
    ///
    /// # Returns
    ///
    /// * `true` if the pair was stored
    /// * `false` if the policy rejected the write (zero capacity, or an
    ///   admission filter that has not seen the key often enough)
    fn put(&self, key: K, value: V) -> bool;

    /// Removes an entry from the cache by its key.
    ///
    /// # Returns
    ///
    /// * `Some(V)` if the key existed (returns the removed value)
    /// * `None` if the key didn't exist
    fn remove(&self, key: &K) -> Option<V>;

    /// Returns the number of live entries in the cache.
    fn len(&self) -> usize;

    /// Returns the configured capacity.
    fn capacity(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all entries from the cache.
    fn clear(&self);
}

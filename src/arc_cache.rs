//! Adaptive replacement cache.
//!
//! Two live caches split the work: an LRU for keys seen recently and an LFU
//! for keys seen often. Each has a ghost of the same kind that remembers the
//! keys (not the values) it recently evicted. A request for a key found in a
//! ghost means that side was too small, so one unit of capacity moves to it
//! from the other side.
//!
//! ```text
//!              ghost hit moves capacity ──►
//!   ┌──────────────┬───────────────────┬──────────────┬──────────────┐
//!   │ recency ghost│ recency (LRU, p)  │ frequency    │ frequency    │
//!   │  keys only   │                   │ (LFU, 2c - p)│ ghost        │
//!   └──────────────┴───────────────────┴──────────────┴──────────────┘
//!              ◄── ghost hit moves capacity
//! ```
//!
//! Both live caches start at the target capacity `c` and a migration always
//! moves exactly one unit, so their capacities always sum to `2c`.

use crate::lfu_cache::{LfuCore, DEFAULT_AVERAGE_CEILING};
use crate::lru_cache::LruCore;
use crate::policy::Cache;
use parking_lot::Mutex;
use std::hash::Hash;
use tracing::{debug, trace};

/// Recency hits at which an entry is also admitted to the frequency side.
pub const DEFAULT_PROMOTION_THRESHOLD: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GhostHit {
    Recency,
    Frequency,
}

struct ArcState<K, V> {
    recency: LruCore<K, V>,
    recency_ghost: LruCore<K, ()>,
    frequency: LfuCore<K, V>,
    frequency_ghost: LfuCore<K, ()>,
    // Keys live on both sides at once
    shared: usize,
}

impl<K, V> ArcState<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            recency: LruCore::new(capacity),
            recency_ghost: LruCore::new(capacity),
            frequency: LfuCore::new(capacity, DEFAULT_AVERAGE_CEILING),
            frequency_ghost: LfuCore::new(capacity, DEFAULT_AVERAGE_CEILING),
            shared: 0,
        }
    }

    // A key can sit in both ghosts when both live caches evicted it; the
    // first hit decides the direction and both traces are dropped.
    fn resolve_ghost(&mut self, key: &K) -> Option<GhostHit> {
        let in_recency = self.recency_ghost.remove(key).is_some();
        let in_frequency = self.frequency_ghost.remove(key).is_some();
        let hit = if in_recency {
            GhostHit::Recency
        } else if in_frequency {
            GhostHit::Frequency
        } else {
            return None;
        };

        match hit {
            GhostHit::Recency => self.shift_to_recency(),
            GhostHit::Frequency => self.shift_to_frequency(),
        }
        Some(hit)
    }

    fn shift_to_recency(&mut self) {
        if self.frequency.capacity() == 0 {
            trace!("arc frequency side exhausted, no capacity moved");
            return;
        }
        if let Some(evicted) = self.frequency.decrease_capacity() {
            if self.recency.contains(&evicted.key) {
                self.shared -= 1;
            }
            self.frequency_ghost.put(evicted.key, ());
        }
        self.recency.increase_capacity();
        debug!(
            recency = self.recency.capacity(),
            frequency = self.frequency.capacity(),
            "arc moved capacity to recency side"
        );
    }

    fn shift_to_frequency(&mut self) {
        if self.recency.capacity() == 0 {
            trace!("arc recency side exhausted, no capacity moved");
            return;
        }
        if let Some(evicted) = self.recency.decrease_capacity() {
            if self.frequency.contains(&evicted.key) {
                self.shared -= 1;
            }
            self.recency_ghost.put(evicted.key, ());
        }
        self.frequency.increase_capacity();
        debug!(
            recency = self.recency.capacity(),
            frequency = self.frequency.capacity(),
            "arc moved capacity to frequency side"
        );
    }

    fn put_recency(&mut self, key: K, value: V) -> bool {
        if self.recency.capacity() == 0 {
            return false;
        }
        let joins = !self.recency.contains(&key) && self.frequency.contains(&key);
        if let Some(evicted) = self.recency.put(key, value) {
            if self.frequency.contains(&evicted.key) {
                self.shared -= 1;
            }
            self.recency_ghost.put(evicted.key, ());
        }
        if joins {
            self.shared += 1;
        }
        true
    }

    fn put_frequency(&mut self, key: K, value: V) -> bool {
        if self.frequency.capacity() == 0 {
            return false;
        }
        let joins = !self.frequency.contains(&key) && self.recency.contains(&key);
        if let Some(evicted) = self.frequency.put(key, value) {
            if self.recency.contains(&evicted.key) {
                self.shared -= 1;
            }
            self.frequency_ghost.put(evicted.key, ());
        }
        if joins {
            self.shared += 1;
        }
        true
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.recency_ghost.remove(key);
        self.frequency_ghost.remove(key);
        let recency = self.recency.remove(key);
        let frequency = self.frequency.remove(key);
        if recency.is_some() && frequency.is_some() {
            self.shared -= 1;
        }
        recency.or(frequency)
    }

    fn live_len(&self) -> usize {
        self.recency.len() + self.frequency.len() - self.shared
    }

    #[cfg(test)]
    fn counted_live_len(&self) -> usize {
        let frequency_only = self
            .frequency
            .keys()
            .filter(|key| !self.recency.contains(key))
            .count();
        self.recency.len() + frequency_only
    }

    fn clear(&mut self, capacity: usize) {
        self.recency.clear();
        self.recency_ghost.clear();
        self.frequency.clear();
        self.frequency_ghost.clear();
        self.shared = 0;
        self.recency.set_capacity(capacity);
        self.frequency.set_capacity(capacity);
    }
}

/// A thread-safe adaptive replacement cache (ARC).
///
/// New keys land in both the recency (LRU) and frequency (LFU) caches. Reads
/// consult the recency side first; a recency hit whose access count reached
/// the promotion threshold is copied into the frequency side. Keys returning
/// from a ghost go to the recency side only. Every operation holds a single
/// lock across all four sub-caches.
///
/// # Examples
///
/// ```rust
/// use policy_cache::{ArcCache, Cache};
///
/// let cache = ArcCache::new(2);
/// cache.put(1, "a");
/// cache.put(2, "b");
/// cache.put(3, "c");
/// assert_eq!(cache.len(), 2);
///
/// // Key 1 comes back from the recency ghost: the recency side grows
/// cache.put(1, "a");
/// assert_eq!(cache.recency_capacity(), 3);
/// assert_eq!(cache.frequency_capacity(), 1);
/// assert_eq!(cache.get(&1), Some("a"));
/// ```
pub struct ArcCache<K, V> {
    inner: Mutex<ArcState<K, V>>,
    capacity: usize,
    promotion_threshold: u64,
}

impl<K, V> ArcCache<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    /// Creates an ARC cache using [`DEFAULT_PROMOTION_THRESHOLD`].
    pub fn new(capacity: usize) -> Self {
        Self::with_promotion_threshold(capacity, DEFAULT_PROMOTION_THRESHOLD)
    }

    pub fn with_promotion_threshold(capacity: usize, promotion_threshold: u64) -> Self {
        Self {
            inner: Mutex::new(ArcState::new(capacity)),
            capacity,
            promotion_threshold,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn promotion_threshold(&self) -> u64 {
        self.promotion_threshold
    }

    /// Current capacity of the live recency (LRU) side.
    pub fn recency_capacity(&self) -> usize {
        self.inner.lock().recency.capacity()
    }

    /// Current capacity of the live frequency (LFU) side.
    pub fn frequency_capacity(&self) -> usize {
        self.inner.lock().frequency.capacity()
    }

    /// Number of keys remembered by the recency and frequency ghosts.
    pub fn ghost_len(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        (inner.recency_ghost.len(), inner.frequency_ghost.len())
    }
}

impl<K, V> Cache<K, V> for ArcCache<K, V>
where
    K: Clone + Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        inner.resolve_ghost(key);

        let hit = inner
            .recency
            .touch(key)
            .map(|entry| (entry.value.clone(), entry.access_count));
        if let Some((value, access_count)) = hit {
            if access_count >= self.promotion_threshold {
                trace!(access_count, "arc promoting recency hit to frequency side");
                inner.put_frequency(key.clone(), value.clone());
            }
            return Some(value);
        }

        inner.frequency.get(key)
    }

    fn put(&self, key: K, value: V) -> bool {
        let mut inner = self.inner.lock();
        if inner.resolve_ghost(&key).is_some() {
            // Returning keys restart on the recency side unless it has
            // been shrunk to nothing.
            if inner.recency.capacity() > 0 {
                // The frequency side may still hold an older copy
                if inner.frequency.contains(&key) {
                    inner.put_frequency(key.clone(), value.clone());
                }
                return inner.put_recency(key, value);
            }
            return inner.put_frequency(key, value);
        }

        let recency = inner.put_recency(key.clone(), value.clone());
        let frequency = inner.put_frequency(key, value);
        recency || frequency
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Number of distinct keys held by the live caches. Ghost keys are not
    /// counted; a key held by both sides counts once.
    fn len(&self) -> usize {
        self.inner.lock().live_len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&self) {
        self.inner.lock().clear(self.capacity);
    }
}

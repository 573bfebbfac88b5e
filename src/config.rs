//! Declarative cache construction.
//!
//! [`CacheConfig`] names a policy together with its tuning parameters and can
//! be deserialized from any serde format, so an embedding service can pick its
//! eviction policy from a configuration file:
//!
//! ```rust
//! use policy_cache::{Cache, CacheConfig};
//!
//! let config = CacheConfig::Arc {
//!     capacity: 128,
//!     promotion_threshold: 4,
//! };
//! let cache = config.build::<u64, String>().unwrap();
//! cache.put(7, "seven".to_string());
//! assert_eq!(cache.get(&7), Some("seven".to_string()));
//! ```

use crate::arc_cache::{ArcCache, DEFAULT_PROMOTION_THRESHOLD};
use crate::error::{ConfigError, Result};
use crate::lfu_cache::{LfuCache, DEFAULT_AVERAGE_CEILING};
use crate::lru_cache::LruCache;
use crate::lru_k_cache::LruKCache;
use crate::policy::Cache;
use crate::sharded_lru_cache::ShardedLruCache;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

// History slots per main-cache slot when LRU-K leaves it unspecified
const HISTORY_FACTOR: usize = 4;

fn default_k() -> u64 {
    2
}

fn default_average_ceiling() -> u64 {
    DEFAULT_AVERAGE_CEILING
}

fn default_promotion_threshold() -> u64 {
    DEFAULT_PROMOTION_THRESHOLD
}

/// A cache policy and its constructor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CacheConfig {
    /// Plain least-recently-used cache.
    Lru { capacity: usize },

    /// LRU that admits a key on its `k`-th access.
    LruK {
        capacity: usize,
        /// Defaults to four times `capacity`.
        #[serde(default)]
        history_capacity: Option<usize>,
        #[serde(default = "default_k")]
        k: u64,
    },

    /// LRU split into independently locked shards.
    ShardedLru {
        capacity: usize,
        /// 0 picks the available hardware parallelism.
        #[serde(default)]
        shards: usize,
    },

    /// Least-frequently-used cache with aging.
    Lfu {
        capacity: usize,
        #[serde(default = "default_average_ceiling")]
        average_ceiling: u64,
    },

    /// Adaptive replacement cache.
    Arc {
        capacity: usize,
        #[serde(default = "default_promotion_threshold")]
        promotion_threshold: u64,
    },
}

impl CacheConfig {
    /// Total number of entries the configured cache may hold.
    pub fn capacity(&self) -> usize {
        match *self {
            CacheConfig::Lru { capacity }
            | CacheConfig::LruK { capacity, .. }
            | CacheConfig::ShardedLru { capacity, .. }
            | CacheConfig::Lfu { capacity, .. }
            | CacheConfig::Arc { capacity, .. } => capacity,
        }
    }

    /// Short display name of the policy.
    pub fn policy_name(&self) -> &'static str {
        match self {
            CacheConfig::Lru { .. } => "LRU",
            CacheConfig::LruK { .. } => "LRU-K",
            CacheConfig::ShardedLru { .. } => "LRU-Hash",
            CacheConfig::Lfu { .. } => "LFU",
            CacheConfig::Arc { .. } => "ARC",
        }
    }

    /// Checks the tuning parameters. A zero capacity is accepted: such a
    /// cache simply rejects every write. An explicit LRU-K history of zero
    /// slots is only accepted with `k == 1`.
    pub fn validate(&self) -> Result<()> {
        match *self {
            CacheConfig::LruK { k: 0, .. } => Err(ConfigError::ZeroPromotionK),
            CacheConfig::LruK {
                history_capacity: Some(0),
                k,
                ..
            } if k > 1 => Err(ConfigError::ZeroHistoryCapacity { k }),
            CacheConfig::Lfu {
                average_ceiling: 0,
                ..
            } => Err(ConfigError::ZeroAverageCeiling),
            CacheConfig::Arc {
                promotion_threshold: 0,
                ..
            } => Err(ConfigError::ZeroPromotionThreshold),
            _ => Ok(()),
        }
    }

    /// Validates the configuration and constructs the cache behind the
    /// common [`Cache`] contract.
    pub fn build<K, V>(&self) -> Result<Box<dyn Cache<K, V>>>
    where
        K: Clone + Hash + Eq + Send + 'static,
        V: Clone + Send + 'static,
    {
        self.validate()?;
        let cache: Box<dyn Cache<K, V>> = match *self {
            CacheConfig::Lru { capacity } => Box::new(LruCache::new(capacity)),
            CacheConfig::LruK {
                capacity,
                history_capacity,
                k,
            } => {
                let history = history_capacity.unwrap_or(capacity.saturating_mul(HISTORY_FACTOR));
                Box::new(LruKCache::new(capacity, history, k))
            }
            CacheConfig::ShardedLru { capacity, shards } => {
                Box::new(ShardedLruCache::with_shards(capacity, shards))
            }
            CacheConfig::Lfu {
                capacity,
                average_ceiling,
            } => Box::new(LfuCache::with_average_ceiling(capacity, average_ceiling)),
            CacheConfig::Arc {
                capacity,
                promotion_threshold,
            } => Box::new(ArcCache::with_promotion_threshold(
                capacity,
                promotion_threshold,
            )),
        };
        Ok(cache)
    }
}

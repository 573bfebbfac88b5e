//! In-process caches with interchangeable eviction policies.
//!
//! This crate provides several cache implementations behind one [`Cache`]
//! contract:
//!
//! 1. [`LruCache`] - least recently used eviction
//! 2. [`LruKCache`] - LRU that only admits keys seen `k` times
//! 3. [`ShardedLruCache`] - LRU split into independently locked shards
//! 4. [`LfuCache`] - least frequently used eviction with frequency aging
//! 5. [`ArcCache`] - adaptive replacement between an LRU and an LFU side,
//!    driven by ghost entries of recently evicted keys
//!
//! # Features
//!
//! - O(1) amortized `get` and `put` for every policy
//! - Thread-safe: each cache (or shard) guards its state with one mutex
//! - Index-based intrusive lists, no `unsafe`
//! - Policies can be chosen at runtime through [`CacheConfig`]
//!
//! # Examples
//!
//! ```rust
//! use policy_cache::{ArcCache, Cache, LruCache, ShardedLruCache};
//!
//! let lru: LruCache<String, String> = LruCache::new(1000);
//! let sharded: ShardedLruCache<String, String> = ShardedLruCache::new(1000);
//!
//! let cache: Box<dyn Cache<u64, String>> = Box::new(ArcCache::new(1000));
//! cache.put(42, "answer".to_string());
//! assert_eq!(cache.get(&42), Some("answer".to_string()));
//! # let _ = (lru, sharded);
//! ```
//!
//! Evictions, aging passes and ARC capacity moves are reported through
//! [`tracing`]; install a subscriber to see them.

pub mod arc_cache;
pub mod config;
pub mod error;
pub mod lfu_cache;
mod list;
pub mod lru_cache;
pub mod lru_k_cache;
mod policy;
pub mod sharded_lru_cache;

pub use arc_cache::ArcCache;
pub use config::CacheConfig;
pub use error::ConfigError;
pub use lfu_cache::LfuCache;
pub use lru_cache::LruCache;
pub use lru_k_cache::LruKCache;
pub use policy::Cache;
pub use sharded_lru_cache::ShardedLruCache;

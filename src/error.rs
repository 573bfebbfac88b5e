//! Configuration errors.
//!
//! Cache operations themselves never fail: a zero capacity turns writes into
//! no-ops and misses are reported as `None`. Only tuning parameters that
//! would make a policy meaningless are rejected, when a [`CacheConfig`] is
//! validated or built.
//!
//! [`CacheConfig`]: crate::config::CacheConfig

use thiserror::Error;

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Invalid cache tuning parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// LRU-K needs at least one observation before admission.
    #[error("lru-k admission threshold `k` must be at least 1")]
    ZeroPromotionK,

    /// With no history slots an LRU-K cache that needs more than one
    /// observation can never admit a key.
    #[error("lru-k history capacity must be at least 1 when `k` is {k}")]
    ZeroHistoryCapacity { k: u64 },

    /// The LFU aging ceiling must allow an average of at least one access.
    #[error("lfu average frequency ceiling must be at least 1")]
    ZeroAverageCeiling,

    /// Access counts start at one, so a zero threshold has no meaning.
    #[error("arc promotion threshold must be at least 1")]
    ZeroPromotionThreshold,
}

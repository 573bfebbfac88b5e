// Behavior every policy must share when used through the `Cache` trait.

use policy_cache::{
    ArcCache, Cache, CacheConfig, ConfigError, LfuCache, LruCache, LruKCache, ShardedLruCache,
};
use std::sync::Arc;
use std::thread;

fn build_all(capacity: usize) -> Vec<(&'static str, Box<dyn Cache<u32, String>>)> {
    let configs = [
        CacheConfig::Lru { capacity },
        CacheConfig::LruK {
            capacity,
            history_capacity: None,
            k: 1,
        },
        CacheConfig::ShardedLru {
            capacity,
            shards: 1,
        },
        CacheConfig::Lfu {
            capacity,
            average_ceiling: 10,
        },
        CacheConfig::Arc {
            capacity,
            promotion_threshold: 10,
        },
    ];
    configs
        .iter()
        .map(|config| (config.policy_name(), config.build::<u32, String>().unwrap()))
        .collect()
}

// ==============================================
// Capacity-0 Behavior
// ==============================================

#[test]
fn zero_capacity_rejects_writes() {
    for (name, cache) in build_all(0) {
        assert_eq!(cache.capacity(), 0, "{name}");
        assert!(!cache.put(1, "one".to_string()), "{name} accepted a write");
        assert_eq!(cache.get(&1), None, "{name}");
        assert_eq!(cache.len(), 0, "{name}");
        assert!(cache.is_empty(), "{name}");
    }
}

// ==============================================
// Basic Contract
// ==============================================

#[test]
fn put_then_get_returns_value() {
    for (name, cache) in build_all(8) {
        assert!(cache.put(1, "one".to_string()), "{name}");
        assert!(cache.put(2, "two".to_string()), "{name}");
        assert_eq!(cache.get(&1).as_deref(), Some("one"), "{name}");
        assert_eq!(cache.get(&2).as_deref(), Some("two"), "{name}");
        assert_eq!(cache.get(&3), None, "{name}");
        assert_eq!(cache.len(), 2, "{name}");
    }
}

#[test]
fn put_overwrites_existing_value() {
    for (name, cache) in build_all(8) {
        cache.put(1, "old".to_string());
        cache.put(1, "new".to_string());
        assert_eq!(cache.get(&1).as_deref(), Some("new"), "{name}");
        assert_eq!(cache.len(), 1, "{name}");
    }
}

#[test]
fn remove_returns_value_once() {
    for (name, cache) in build_all(8) {
        cache.put(7, "seven".to_string());
        assert_eq!(cache.remove(&7).as_deref(), Some("seven"), "{name}");
        assert_eq!(cache.remove(&7), None, "{name}");
        assert_eq!(cache.get(&7), None, "{name}");
        assert!(cache.is_empty(), "{name}");
    }
}

#[test]
fn clear_empties_and_keeps_capacity() {
    for (name, cache) in build_all(4) {
        for key in 0..10 {
            cache.put(key, key.to_string());
        }
        cache.clear();
        assert!(cache.is_empty(), "{name}");
        assert_eq!(cache.capacity(), 4, "{name}");
        assert!(cache.put(1, "one".to_string()), "{name}");
        assert_eq!(cache.get(&1).as_deref(), Some("one"), "{name}");
    }
}

#[test]
fn single_policy_caches_respect_capacity() {
    for (name, cache) in build_all(5) {
        for key in 0..100 {
            cache.put(key, key.to_string());
            cache.get(&(key / 2));
        }
        // ARC may keep up to twice its target across both live sides
        let bound = if name == "ARC" { 10 } else { 5 };
        assert!(cache.len() <= bound, "{name} holds {}", cache.len());
    }
}

// ==============================================
// Documented Scenarios
// ==============================================

#[test]
fn lru_evicts_least_recently_used() {
    let cache = LruCache::new(2);
    cache.put(1, "a");
    cache.put(2, "b");
    cache.put(3, "c");
    assert_eq!(cache.get(&1), None);
    assert_eq!(cache.get(&2), Some("b"));
    assert_eq!(cache.get(&3), Some("c"));
}

#[test]
fn lfu_evicts_least_frequently_used() {
    let cache = LfuCache::new(2);
    cache.put(1, "a");
    cache.put(2, "b");
    assert_eq!(cache.get(&1), Some("a"));
    cache.put(3, "c");
    assert_eq!(cache.get(&2), None);
    assert_eq!(cache.get(&1), Some("a"));
    assert_eq!(cache.get(&3), Some("c"));
}

#[test]
fn lru_k_admits_on_kth_write() {
    let cache = LruKCache::new(4, 16, 3);
    assert!(!cache.put("k", 1));
    assert!(!cache.put("k", 2));
    assert_eq!(cache.get(&"k"), None);
    // The read above counts as the third access, so this write admits
    assert!(cache.put("k", 3));
    assert_eq!(cache.get(&"k"), Some(3));
    assert_eq!(cache.history_count(&"k"), None);
}

#[test]
fn arc_ghost_hit_moves_capacity() {
    let cache = ArcCache::new(2);
    cache.put(1, "a");
    cache.put(2, "b");
    cache.put(3, "c");
    assert_eq!(cache.recency_capacity() + cache.frequency_capacity(), 4);

    cache.put(1, "a");
    assert_eq!(cache.recency_capacity(), 3);
    assert_eq!(cache.frequency_capacity(), 1);
    assert_eq!(cache.get(&1), Some("a"));
}

#[test]
fn sharded_len_is_sum_of_shards() {
    let cache = ShardedLruCache::with_shards(40, 4);
    for key in 0..30u32 {
        cache.put(key, key);
    }
    assert_eq!(cache.len(), cache.shard_lens().iter().sum::<usize>());
    assert_eq!(cache.num_shards(), 4);
}

// ==============================================
// Configuration
// ==============================================

#[test]
fn config_from_json_builds_working_cache() {
    let config: CacheConfig =
        serde_json::from_str(r#"{ "policy": "lfu", "capacity": 3, "average_ceiling": 4 }"#)
            .unwrap();
    let cache = config.build::<String, u64>().unwrap();
    cache.put("a".to_string(), 1);
    assert_eq!(cache.get(&"a".to_string()), Some(1));
    assert_eq!(cache.capacity(), 3);
}

#[test]
fn invalid_config_is_rejected() {
    let config = CacheConfig::LruK {
        capacity: 4,
        history_capacity: None,
        k: 0,
    };
    assert_eq!(
        config.build::<u32, u32>().err(),
        Some(ConfigError::ZeroPromotionK)
    );
}

// ==============================================
// Concurrency
// ==============================================

#[test]
fn shared_trait_objects_survive_concurrent_use() {
    for (name, cache) in build_all(64) {
        let cache: Arc<dyn Cache<u32, String>> = Arc::from(cache);
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000u32 {
                        let key = (t * 31 + i) % 128;
                        if i % 3 == 0 {
                            cache.put(key, key.to_string());
                        } else if let Some(value) = cache.get(&key) {
                            assert_eq!(value, key.to_string());
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 128, "{name}");
    }
}

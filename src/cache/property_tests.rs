//! Property-Based Tests for Cache Module
//!
//! Uses proptest over a [`TrackedCache`] backed by [`MemoryStore`].

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{filter_keys, KeyPattern, TrackedCache};
use crate::store::{MemoryStore, ValueStore};

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 100;

fn memory_cache(max_size: usize) -> (TrackedCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = TrackedCache::new(store.clone(), max_size, "unused-dump.json");
    (cache, store)
}

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,64}"
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}"
}

fn unique_keys_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(valid_key_strategy(), min..max).prop_map(|keys| {
        let mut seen = HashSet::new();
        keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
    })
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // Small key space so operations collide
    let key = "[a-d]{1,2}";
    prop_oneof![
        (key, valid_value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property 1: Round-trip
    // *For any* valid key and value, get after set returns the stored value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let (cache, _) = memory_cache(TEST_MAX_SIZE);

        cache.set(&key, &value, 0).unwrap();

        let retrieved: Option<String> = cache.get(&key).unwrap();
        prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
    }

    // Property 2: Delete removes the key from store and registry
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let (cache, store) = memory_cache(TEST_MAX_SIZE);
        cache.set(&key, &value, 0).unwrap();

        prop_assert!(cache.delete(&key).unwrap());

        prop_assert_eq!(cache.get::<String>(&key).unwrap(), None);
        prop_assert!(!cache.get_all_keys().contains(&key));
        prop_assert!(store.is_empty());
    }

    // Property 3: Overwrite
    // *For any* key, set V1 then set V2 leaves V2 and a single entry.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let (cache, _) = memory_cache(TEST_MAX_SIZE);

        cache.set(&key, &value1, 0).unwrap();
        cache.set(&key, &value2, 0).unwrap();

        prop_assert_eq!(cache.get::<String>(&key).unwrap(), Some(value2));
        prop_assert_eq!(cache.size(), 1, "Should have exactly one entry after overwrite");
    }

    // Property 4: Capacity
    // *For any* sequence of sets, the registry never exceeds max_size and
    // evicted values leave the store with their keys.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let max_size = 50;
        let (cache, store) = memory_cache(max_size);

        for (key, value) in entries {
            cache.set(&key, &value, 0).unwrap();
            prop_assert!(cache.size() <= max_size, "size {} exceeds max {}", cache.size(), max_size);
            prop_assert_eq!(store.len(), cache.size(), "store and registry diverged");
        }
    }

    // Property 5: Registry consistency
    // *For any* operation sequence, size matches the key list, every listed
    // key resolves, and hit/miss counters match the observed reads.
    #[test]
    fn prop_registry_consistency(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (cache, store) = memory_cache(8);
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(&key, &value, 0).unwrap(),
                CacheOp::Get { key } => match cache.get::<String>(&key).unwrap() {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    cache.delete(&key).unwrap();
                }
            }
        }

        let keys = cache.get_all_keys();
        prop_assert_eq!(cache.size(), keys.len());
        for key in &keys {
            prop_assert!(store.get(key).unwrap().is_some(), "tracked key {} has no value", key);
        }
        prop_assert_eq!(cache.counters().hits(), expected_hits);
        prop_assert_eq!(cache.counters().misses(), expected_misses);
    }

    // Property 6: Eviction follows insertion order
    // *For any* full cache, adding a new key evicts the first-inserted key,
    // even if it was just read.
    #[test]
    fn prop_eviction_by_insertion_order(
        keys in unique_keys_strategy(3, 10),
        new_key in valid_key_strategy(),
    ) {
        prop_assume!(keys.len() >= 2);
        prop_assume!(!keys.contains(&new_key));

        let capacity = keys.len();
        let (cache, _) = memory_cache(capacity);
        for key in &keys {
            cache.set(key, &format!("value_{}", key), 0).unwrap();
        }

        // Reads do not protect a key from eviction
        let oldest = keys[0].clone();
        let _ = cache.get::<String>(&oldest).unwrap();

        cache.set(&new_key, "new", 0).unwrap();

        prop_assert_eq!(cache.size(), capacity);
        prop_assert_eq!(cache.get::<String>(&oldest).unwrap(), None);
        let mut expected: Vec<String> = keys[1..].to_vec();
        expected.push(new_key);
        prop_assert_eq!(cache.get_all_keys(), expected);
    }

    // Property 7: Overwrite moves a key to newest
    #[test]
    fn prop_overwrite_postpones_eviction(
        keys in unique_keys_strategy(3, 8),
        new_key in valid_key_strategy(),
    ) {
        prop_assume!(keys.len() >= 3);
        prop_assume!(!keys.contains(&new_key));

        let (cache, _) = memory_cache(keys.len());
        for key in &keys {
            cache.set(key, "v", 0).unwrap();
        }
        cache.set(&keys[0], "rewritten", 0).unwrap();

        cache.set(&new_key, "new", 0).unwrap();

        prop_assert!(cache.get_all_keys().contains(&keys[0]));
        prop_assert!(!cache.get_all_keys().contains(&keys[1]));
    }

    // Property 8: An escaped literal pattern is a substring filter
    #[test]
    fn prop_literal_pattern_is_substring_match(
        keys in unique_keys_strategy(1, 30),
        needle in "[a-z:]{1,3}",
    ) {
        let pattern = KeyPattern::compile(&regex::escape(&needle)).unwrap();

        let matched = filter_keys(&pattern, &keys);

        let expected: Vec<String> = keys.iter().filter(|k| k.contains(&needle)).cloned().collect();
        prop_assert_eq!(matched, expected);
    }
}

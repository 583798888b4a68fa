//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the memory table and the two-tier service against
//! arbitrary operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheService, ManualClock, MemoryLookup, MemoryTable, Ttl};
use crate::config::CacheConfig;
use crate::storage::{KeyValueStore, MemoryStore};

// == Test Configuration ==
const TEST_MAX_ITEMS: usize = 100;

// == Strategies ==
/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,24}".prop_map(|s| s)
}

/// Generates JSON payloads of the shapes callers cache
fn payload_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,64}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        prop::collection::vec(any::<u16>(), 0..8).prop_map(|v| json!(v)),
        ("[A-Z]{3}", any::<u32>()).prop_map(|(code, price)| json!({"code": code, "price": price})),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), payload_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

fn service(max_items: usize) -> (CacheService, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let config = CacheConfig {
        max_memory_items: max_items,
        ..CacheConfig::default()
    };
    let cache = CacheService::with_clock(config, store.clone(), clock.clone()).unwrap();
    (cache, store, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a payload and reading it back before expiry returns it unchanged.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in payload_strategy()) {
        let (cache, _, _) = service(TEST_MAX_ITEMS);

        tokio_test::block_on(async {
            cache.set(&key, &value, None).await;
            let retrieved: Option<Value> = cache.get(&key).await;
            prop_assert_eq!(retrieved, Some(value));
            Ok(())
        })?;
    }

    // The service agrees with a plain HashMap model for any set/get/remove sequence.
    #[test]
    fn prop_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (cache, _, _) = service(TEST_MAX_ITEMS);
        let mut model: HashMap<String, Value> = HashMap::new();

        tokio_test::block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(&key, &value, None).await;
                        model.insert(key, value);
                    }
                    CacheOp::Get { key } => {
                        let got: Option<Value> = cache.get(&key).await;
                        prop_assert_eq!(got.as_ref(), model.get(&key));
                    }
                    CacheOp::Remove { key } => {
                        cache.remove(&key).await;
                        model.remove(&key);
                    }
                }
            }
            prop_assert_eq!(cache.stats().memory_items, model.len());
            Ok(())
        })?;
    }

    // Hits and misses counted by the service match what callers observed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let (cache, _, _) = service(TEST_MAX_ITEMS);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        tokio_test::block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(&key, &value, None).await;
                    }
                    CacheOp::Get { key } => match cache.get::<Value>(&key).await {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    },
                    CacheOp::Remove { key } => cache.remove(&key).await,
                }
            }
        });

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
    }

    // The memory tier never holds more than its configured capacity.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((key_strategy(), payload_strategy()), 1..200)
    ) {
        let max_items = 20;
        let mut table = MemoryTable::new(max_items);

        for (i, (key, value)) in entries.into_iter().enumerate() {
            table.insert(key, CacheEntry::new(value.into(), i as u64, Ttl::MEDIUM));
            prop_assert!(
                table.len() <= max_items,
                "Table size {} exceeds max {}",
                table.len(),
                max_items
            );
        }
    }

    // With distinct keys, eviction removes exactly the earliest insertions.
    #[test]
    fn prop_eviction_is_insertion_ordered(
        keys in prop::collection::hash_set(key_strategy(), 3..30),
        capacity in 1usize..10,
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let mut table = MemoryTable::new(capacity);

        // Same timestamp for all: order must come from the insertion sequence.
        for key in &keys {
            table.insert(key.clone(), CacheEntry::new(json!(key).into(), 0, Ttl::MEDIUM));
        }

        let survivors = keys.len().min(capacity);
        prop_assert_eq!(table.len(), survivors);
        for (i, key) in keys.iter().enumerate() {
            let expected_present = i >= keys.len() - survivors;
            prop_assert_eq!(table.contains(key), expected_present, "key {}", key);
        }
    }

    // Any TTL expires exactly when its duration has elapsed, in memory and on disk.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in key_strategy(),
        value in payload_strategy(),
        ttl_ms in 1u64..10_000_000,
    ) {
        let (cache, store, clock) = service(TEST_MAX_ITEMS);

        tokio_test::block_on(async {
            cache.set(&key, &value, Some(Ttl::from_millis(ttl_ms))).await;

            clock.advance(Duration::from_millis(ttl_ms - 1));
            prop_assert_eq!(cache.get::<Value>(&key).await, Some(value));

            clock.advance(Duration::from_millis(1));
            prop_assert_eq!(cache.get::<Value>(&key).await, None);

            // Any persisted copy was cleaned up on discovery.
            let storage_key = format!("@cache_{key}");
            prop_assert!(store.get_item(&storage_key).await.unwrap().is_none());
            Ok(())
        })?;
    }

    // Invalidation removes exactly the keys containing the pattern.
    #[test]
    fn prop_invalidate_pattern_scoping(
        keys in prop::collection::hash_set(key_strategy(), 1..20),
        pattern in "[a-z]{1,2}",
    ) {
        let (cache, store, _) = service(TEST_MAX_ITEMS);

        tokio_test::block_on(async {
            for key in &keys {
                cache.set(key, key, Some(Ttl::LONG)).await;
            }

            cache.invalidate_pattern(&pattern).await;

            for key in &keys {
                let got: Option<String> = cache.get(key).await;
                if key.contains(pattern.as_str()) {
                    prop_assert_eq!(got, None, "{} should be invalidated", key);
                } else {
                    prop_assert_eq!(got.as_deref(), Some(key.as_str()));
                }
            }

            let persisted = store.get_all_keys().await.unwrap();
            prop_assert!(persisted.iter().all(|k| !k["@cache_".len()..].contains(pattern.as_str())));
            Ok(())
        })?;
    }
}

#[test]
fn test_lookup_reports_expiry_once() {
    let mut table = MemoryTable::new(4);
    table.insert("k".to_string(), CacheEntry::new(json!(1).into(), 0, Ttl::from_millis(5)));

    assert_eq!(table.lookup("k", 5), MemoryLookup::Expired);
    assert_eq!(table.lookup("k", 5), MemoryLookup::Absent);
}

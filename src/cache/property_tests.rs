//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check size accounting, eviction and expiry laws on the
//! store, and the same laws end to end through the async engine.

use proptest::prelude::*;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{
    current_timestamp_ms, estimate_size, CacheStore, EvictionStrategy, Lookup, Metadata,
    SetOptions, StoredEntry, MAX_KEY_LENGTH,
};
use crate::config::CacheConfig;
use crate::engine::Cache;

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 2048;

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}".prop_map(|s| s)
}

/// Generates valid cache values
fn valid_value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

fn strategy_strategy() -> impl Strategy<Value = EvictionStrategy> {
    prop_oneof![
        Just(EvictionStrategy::Lru),
        Just(EvictionStrategy::Lfu),
        Just(EvictionStrategy::Fifo),
    ]
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Vec<u8> },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // A small key space so operations collide
    let key = "k[0-9]";
    prop_oneof![
        (key, valid_value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn stored(key: &str, value: &[u8]) -> StoredEntry {
    let size = estimate_size(key, value);
    StoredEntry {
        value: value.to_vec(),
        metadata: Metadata::new(&SetOptions::new(), Duration::ZERO, size, current_timestamp_ms()),
    }
}

fn engine(max_size: usize, strategy: EvictionStrategy) -> Cache {
    Cache::new(CacheConfig {
        max_size,
        strategy,
        ..Default::default()
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Size invariant: the running size counter always equals the sum of
    // the sizes of the live entries, and never exceeds capacity.
    #[test]
    fn prop_size_invariant(
        strategy in strategy_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let mut store = CacheStore::new(TEST_MAX_SIZE / 4, None, strategy);
        let now = current_timestamp_ms();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let _ = store.insert(key.clone(), stored(&key, &value));
                }
                CacheOp::Get { key } => {
                    let _ = store.get(&key, now);
                }
                CacheOp::Delete { key } => {
                    let _ = store.remove(&key);
                }
            }
            prop_assert_eq!(store.total_size(), store.computed_size());
            prop_assert!(store.total_size() <= store.max_size());
        }
    }

    // Eviction bound: with an entry cap, the store never holds more than
    // the cap, whatever the strategy.
    #[test]
    fn prop_entry_cap_enforcement(
        strategy in strategy_strategy(),
        cap in 1usize..10,
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..60)
    ) {
        let mut store = CacheStore::new(usize::MAX / 2, Some(cap), strategy);

        for (key, value) in entries {
            store.insert(key.clone(), stored(&key, &value)).unwrap();
            prop_assert!(store.len() <= cap, "{} entries exceed cap {}", store.len(), cap);
        }
    }

    // LRU order: after filling to capacity and reading the oldest key, the
    // next insert evicts the second oldest.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(valid_key_strategy(), 3..8),
        new_key in valid_key_strategy(),
    ) {
        let unique_keys: Vec<String> = {
            let mut seen = HashSet::new();
            keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
        };
        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let mut store = CacheStore::new(usize::MAX / 2, Some(capacity), EvictionStrategy::Lru);
        let now = current_timestamp_ms();

        for key in &unique_keys {
            store.insert(key.clone(), stored(key, b"value")).unwrap();
        }

        let accessed_key = &unique_keys[0];
        prop_assert!(matches!(store.get(accessed_key, now), Lookup::Hit(_)));

        let outcome = store.insert(new_key.clone(), stored(&new_key, b"new")).unwrap();
        let evicted: Vec<&str> = outcome.evicted.iter().map(|r| r.key.as_str()).collect();
        prop_assert_eq!(evicted, vec![unique_keys[1].as_str()]);
        prop_assert!(store.contains_key(accessed_key));
        prop_assert!(store.contains_key(&new_key));
    }

    // Statistics accuracy through the engine: hits and misses match the
    // outcomes of the reads, and item_count matches the live entries.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let cache = engine(TEST_MAX_SIZE * 64, EvictionStrategy::Lru);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        tokio_test::block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(key, value, SetOptions::new()).await.unwrap();
                    }
                    CacheOp::Get { key } => match cache.get(&key).await {
                        Ok(_) => expected_hits += 1,
                        Err(_) => expected_misses += 1,
                    },
                    CacheOp::Delete { key } => {
                        cache.delete(&key).await;
                    }
                }
            }
        });

        let stats = tokio_test::block_on(cache.stats());
        let len = tokio_test::block_on(cache.len());
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.item_count, len, "Item count mismatch");
    }

    // Round trip through the engine, including the compression path.
    #[test]
    fn prop_roundtrip_storage(
        key in valid_key_strategy(),
        value in prop::collection::vec(any::<u8>(), 0..4096),
        compress in any::<bool>()
    ) {
        let cache = engine(TEST_MAX_SIZE * 8, EvictionStrategy::Lru);

        let retrieved = tokio_test::block_on(async {
            cache.set(key.clone(), value.clone(), SetOptions::new().compress(compress)).await.unwrap();
            cache.get(&key).await.unwrap()
        });
        prop_assert_eq!(retrieved, value);
    }

    // Tag deletion precision: exactly the entries carrying the tag go.
    #[test]
    fn prop_tag_deletion_precision(tagged in prop::collection::vec(any::<bool>(), 1..20)) {
        let cache = engine(TEST_MAX_SIZE * 8, EvictionStrategy::Fifo);

        let (deleted, survivors) = tokio_test::block_on(async {
            for (i, has_tag) in tagged.iter().enumerate() {
                let tags: Vec<&str> = if *has_tag { vec!["hot", "x"] } else { vec!["cold"] };
                cache.set(format!("k{}", i), b"v".to_vec(), SetOptions::new().tags(tags)).await.unwrap();
            }
            let deleted = cache.delete_by_tags(&["hot"]).await;
            let mut survivors = Vec::new();
            for i in 0..tagged.len() {
                survivors.push(cache.has(&format!("k{}", i)).await);
            }
            (deleted, survivors)
        });

        prop_assert_eq!(deleted, tagged.iter().filter(|t| **t).count());
        for (has_tag, survived) in tagged.iter().zip(survivors) {
            prop_assert_eq!(survived, !*has_tag);
        }
    }
}

// TTL bounds: any TTL in seconds yields a deadline after creation or none
// at all, and storing with it succeeds.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_ttl_deadline_after_creation(
        ttl_secs in any::<u64>(),
        now in prop_oneof![Just(0u64), Just(current_timestamp_ms()), any::<u64>()]
    ) {
        let meta = Metadata::new(&SetOptions::new(), Duration::from_secs(ttl_secs), 1, now);

        prop_assert_eq!(meta.created_at, now);
        prop_assert!(meta.expires_at.map_or(true, |e| e > meta.created_at));
        if ttl_secs == 0 {
            prop_assert!(meta.expires_at.is_none());
        }
    }

    #[test]
    fn prop_set_accepts_any_ttl(key in valid_key_strategy(), ttl_secs in any::<u64>()) {
        let cache = engine(TEST_MAX_SIZE, EvictionStrategy::Lru);
        let options = SetOptions::new().ttl(Duration::from_secs(ttl_secs));

        let present = tokio_test::block_on(async {
            cache.set(key.clone(), b"v".to_vec(), options).await.unwrap();
            cache.has(&key).await
        });
        // Zero means no expiry; anything else lasts at least a second
        prop_assert!(present);
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // TTL law: readable before the TTL elapses, gone after.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        let cache = engine(TEST_MAX_SIZE * 8, EvictionStrategy::Lru);
        let options = SetOptions::new().ttl(Duration::from_millis(40));

        let before = tokio_test::block_on(async {
            cache.set(key.clone(), value.clone(), options).await.unwrap();
            cache.get(&key).await
        });
        prop_assert_eq!(before.unwrap(), value);

        sleep(Duration::from_millis(60));

        prop_assert!(tokio_test::block_on(cache.get(&key)).is_err());
        let stats = tokio_test::block_on(cache.stats());
        prop_assert_eq!(stats.expirations, 1);
        prop_assert_eq!(stats.size, 0);
    }
}

// == Property Test for Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Every error maps to a JSON body with a string "error" field.
    #[test]
    fn prop_error_response_format(
        error_msg in "[a-zA-Z0-9 _-]{1,100}"
    ) {
        use crate::error::CacheError;
        use axum::body::to_bytes;
        use axum::response::IntoResponse;

        let error_variants = vec![
            CacheError::NotFound(error_msg.clone()),
            CacheError::InvalidRequest(error_msg.clone()),
            CacheError::InvalidPattern(error_msg.clone()),
            CacheError::Transform(error_msg.clone()),
            CacheError::Internal(error_msg.clone()),
        ];

        for error in error_variants {
            let expected_msg = error.to_string();
            let response = error.into_response();

            let content_type = response.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(
                content_type.map(|ct| ct.contains("application/json")).unwrap_or(false),
                "Response should have JSON content-type"
            );

            let bytes = tokio_test::block_on(to_bytes(response.into_body(), usize::MAX)).unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .expect("Response body should be valid JSON");

            prop_assert_eq!(json["error"].as_str(), Some(expected_msg.as_str()));
        }
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[tokio::test]
    async fn test_key_length_validation() {
        let cache = engine(TEST_MAX_SIZE, EvictionStrategy::Lru);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = cache.set(long_key, b"value".to_vec(), SetOptions::new()).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
        let result = cache.set("", b"value".to_vec(), SetOptions::new()).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_oversized_value_rejected() {
        let cache = engine(64, EvictionStrategy::Lru);
        cache.set("small", b"ok".to_vec(), SetOptions::new()).await.unwrap();

        let result = cache.set("big", vec![0u8; 128], SetOptions::new()).await;
        assert!(matches!(result, Err(CacheError::OversizedValue { .. })));
        assert!(cache.has("small").await, "rejection must not evict");
    }
}

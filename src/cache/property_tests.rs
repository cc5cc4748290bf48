//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store against a simple reference model.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{BoundedTagCache, ManualClock};
use crate::error::CacheError;

// == Strategies ==
/// Small key space so that operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]".prop_map(|s| s)
}

fn tag_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("t1"), Just("t2"), Just("t3")]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: i64, tags: Vec<&'static str> },
    Get { key: String },
    Exists { key: String },
    Remove { key: String },
    Increment { key: String },
    RemoveByTag { tag: &'static str },
    KeysByTag { tag: &'static str },
    Flush,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), any::<i32>(), prop::collection::vec(tag_strategy(), 0..3))
            .prop_map(|(key, value, tags)| CacheOp::Set { key, value: value.into(), tags }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Exists { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Increment { key }),
        1 => tag_strategy().prop_map(|tag| CacheOp::RemoveByTag { tag }),
        1 => tag_strategy().prop_map(|tag| CacheOp::KeysByTag { tag }),
        1 => Just(CacheOp::Flush),
    ]
}

// == Reference Model ==
/// Most recently used first; a plain Vec is fine at this size.
#[derive(Debug, Default)]
struct Model {
    capacity: usize,
    entries: Vec<(String, i64, Vec<&'static str>)>,
}

impl Model {
    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _, _)| k == key)
    }

    fn touch(&mut self, pos: usize) {
        let entry = self.entries.remove(pos);
        self.entries.insert(0, entry);
    }

    fn set(&mut self, key: &str, value: i64, tags: &[&'static str]) {
        if let Some(pos) = self.position(key) {
            self.entries.remove(pos);
        }
        self.entries.insert(0, (key.to_string(), value, tags.to_vec()));
        if self.capacity > 0 {
            self.entries.truncate(self.capacity);
        }
    }

    fn get(&mut self, key: &str) -> Option<i64> {
        let pos = self.position(key)?;
        self.touch(pos);
        Some(self.entries[0].1)
    }

    fn increment(&mut self, key: &str) -> Option<i64> {
        let pos = self.position(key)?;
        let next = self.entries[pos].1.checked_add(1)?;
        self.touch(pos);
        self.entries[0].1 = next;
        Some(next)
    }

    fn keys_by_tag(&self, tag: &str) -> HashSet<String> {
        self.entries
            .iter()
            .filter(|(_, _, tags)| tags.iter().any(|t| *t == tag))
            .map(|(k, _, _)| k.clone())
            .collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Any sequence of operations without TTLs behaves like the reference LRU
    // model, and the index and both link directions stay consistent.
    #[test]
    fn prop_matches_reference_model(
        capacity in 0usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let cache = BoundedTagCache::new(capacity);
        let mut model = Model { capacity, ..Model::default() };

        for op in ops {
            match op {
                CacheOp::Set { key, value, tags } => {
                    cache.set(&key, &value, None, &tags).unwrap();
                    model.set(&key, value, &tags);
                }
                CacheOp::Get { key } => {
                    let actual = cache.get::<i64>(&key).ok();
                    prop_assert_eq!(actual, model.get(&key), "get {}", key);
                }
                CacheOp::Exists { key } => {
                    prop_assert_eq!(cache.exists(&key), model.position(&key).is_some());
                }
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                    if let Some(pos) = model.position(&key) {
                        model.entries.remove(pos);
                    }
                }
                CacheOp::Increment { key } => {
                    let exists = model.position(&key).is_some();
                    let expected = model.increment(&key);
                    match cache.increment(&key) {
                        Ok(value) => prop_assert_eq!(Some(value), expected),
                        Err(CacheError::NotFound(_)) => prop_assert!(!exists),
                        Err(CacheError::NotInteger(_)) => prop_assert!(exists && expected.is_none()),
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                }
                CacheOp::RemoveByTag { tag } => {
                    cache.remove_by_tag(tag);
                    model.entries.retain(|(_, _, tags)| !tags.contains(&tag));
                }
                CacheOp::KeysByTag { tag } => {
                    let actual: HashSet<String> = cache.get_keys_by_tag(tag).into_iter().collect();
                    prop_assert_eq!(actual, model.keys_by_tag(tag));
                }
                CacheOp::Flush => {
                    cache.flush();
                    model.entries.clear();
                }
            }

            prop_assert_eq!(cache.len(), model.entries.len());
            cache.assert_consistent();
        }
    }

    // The number of entries never exceeds a non-zero capacity.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..20,
        keys in prop::collection::vec("[a-z0-9]{1,6}", 1..200)
    ) {
        let cache = BoundedTagCache::new(capacity);

        for key in keys {
            cache.set(&key, &key, None, &[]).unwrap();
            prop_assert!(cache.len() <= capacity, "size {} exceeds {}", cache.len(), capacity);
        }
    }

    // Filling to capacity and inserting one more key evicts the first key,
    // unless it was read in between, in which case the second key goes.
    #[test]
    fn prop_lru_eviction_order(
        keys in prop::collection::hash_set("[a-z]{1,8}", 3..10),
        read_oldest in any::<bool>()
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let cache = BoundedTagCache::new(keys.len());
        for key in &keys {
            cache.set(key, key, None, &[]).unwrap();
        }

        if read_oldest {
            cache.get::<String>(&keys[0]).unwrap();
        } else {
            // Probing does not count as use
            prop_assert!(cache.exists(&keys[0]));
        }
        cache.set("NEW", "new", None, &[]).unwrap();

        let evicted = if read_oldest { &keys[1] } else { &keys[0] };
        prop_assert!(!cache.exists(evicted), "{} should be evicted", evicted);
        prop_assert!(cache.exists("NEW"));
        prop_assert_eq!(cache.len(), keys.len());
    }

    // Entries disappear once their TTL elapses, whichever operation touches them first.
    #[test]
    fn prop_ttl_expiration_behavior(
        ttl_ms in 1u64..10_000,
        accessor in 0u8..4
    ) {
        let clock = ManualClock::default();
        let cache = BoundedTagCache::with_clock(0, Arc::new(clock.clone()));
        cache.set("key", &1, Some(Duration::from_millis(ttl_ms)), &["tag"]).unwrap();

        clock.advance(Duration::from_millis(ttl_ms - 1));
        prop_assert!(cache.exists("key"));

        clock.advance(Duration::from_millis(1));
        match accessor {
            0 => prop_assert!(cache.get::<i64>("key").unwrap_err().is_not_found()),
            1 => prop_assert!(!cache.exists("key")),
            2 => prop_assert!(cache.increment("key").unwrap_err().is_not_found()),
            _ => prop_assert!(cache.get_keys_by_tag("tag").is_empty()),
        }
        prop_assert!(cache.is_empty());
        prop_assert_eq!(cache.stats().expirations, 1);
    }
}

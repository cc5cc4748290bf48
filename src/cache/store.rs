//! Cache Store Module
//!
//! Bounded key-value store combining a HashMap index with an LRU recency list,
//! tag-scoped group operations and lazy TTL expiration, all behind one mutex.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, Codec, JsonCodec, RecencyList, SystemClock};
use crate::error::{CacheError, Result};

// == Store State ==
/// Everything guarded by the store lock.
#[derive(Debug, Default)]
struct Inner {
    /// Key -> slot handle in `list`
    index: HashMap<String, usize>,
    /// Owns every entry, most recently used first
    list: RecencyList<CacheEntry>,
    stats: CacheStats,
}

impl Inner {
    /// Resolves a key to a live slot, discarding it first if it has expired.
    fn lookup_live(&mut self, key: &str, now: DateTime<Utc>) -> Option<usize> {
        let idx = *self.index.get(key)?;
        let expired = self
            .list
            .get(idx)
            .map_or(true, |entry| entry.is_expired(now));
        if expired {
            self.discard_expired(idx);
            return None;
        }
        Some(idx)
    }

    fn discard_expired(&mut self, idx: usize) {
        if let Some(entry) = self.remove_slot(idx) {
            self.stats.record_expiration();
            debug!(key = %entry.key, "Discarded expired entry");
        }
    }

    fn remove_slot(&mut self, idx: usize) -> Option<CacheEntry> {
        let entry = self.list.remove(idx)?;
        self.index.remove(&entry.key);
        Some(entry)
    }

    /// Pops from the LRU end until the capacity bound holds again.
    fn evict_overflow(&mut self, capacity: usize) {
        while capacity > 0 && self.list.len() > capacity {
            let Some((_, entry)) = self.list.pop_back() else {
                break;
            };
            self.index.remove(&entry.key);
            self.stats.record_eviction();
            debug!(key = %entry.key, capacity, "Evicted least recently used entry");
        }
    }

    /// Visits every entry once: expired ones are discarded, matching live keys collected.
    fn scan_tags(
        &mut self,
        now: DateTime<Utc>,
        matches: impl Fn(&CacheEntry) -> bool,
    ) -> Vec<usize> {
        let mut expired = Vec::new();
        let mut matched = Vec::new();
        for (idx, entry) in self.list.iter() {
            if entry.is_expired(now) {
                expired.push(idx);
            } else if matches(entry) {
                matched.push(idx);
            }
        }
        for idx in expired {
            self.discard_expired(idx);
        }
        matched
    }
}

// == Bounded Tag Cache ==
/// Thread-safe bounded cache with LRU eviction, per-entry TTL and tags.
///
/// Values are encoded with `C` on the way in and decoded on the way out; the
/// store itself only ever holds bytes. Every public operation takes the single
/// store lock for its whole duration.
///
/// # Example
/// ```
/// use tagcache::cache::BoundedTagCache;
///
/// let cache = BoundedTagCache::new(2);
/// cache.set("a", &1, None, &["numbers"]).unwrap();
/// cache.set("b", &2, None, &["numbers"]).unwrap();
/// cache.set("c", &3, None, &[]).unwrap();
///
/// assert!(!cache.exists("a"));
/// assert_eq!(cache.get_keys_by_tag("numbers"), vec!["b".to_string()]);
/// ```
pub struct BoundedTagCache<C = JsonCodec> {
    inner: Mutex<Inner>,
    /// Maximum entry count, 0 = unbounded
    capacity: usize,
    codec: C,
    clock: Arc<dyn Clock>,
}

impl BoundedTagCache<JsonCodec> {
    // == Constructor ==
    /// Creates a store using JSON encoding and the wall clock.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries; 0 means unbounded
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// Creates a store using JSON encoding and the given clock.
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self::with_codec_and_clock(capacity, JsonCodec, clock)
    }
}

impl<C: Codec> BoundedTagCache<C> {
    pub fn with_codec_and_clock(capacity: usize, codec: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
            codec,
            clock,
        }
    }

    // == Set ==
    /// Encodes and stores a value.
    ///
    /// Overwriting an existing key replaces value, tags and expiry and marks it
    /// most recently used. Inserting a new key may evict least recently used
    /// entries to stay within capacity.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - Value to encode with the store's codec
    /// * `ttl` - Time to live; `None` or zero never expires
    /// * `tags` - Labels for group lookup and invalidation, duplicates ignored
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        self.set_bytes(key, bytes, ttl, tags);
        Ok(())
    }

    /// Stores already encoded bytes. Never fails.
    pub fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>, tags: &[&str]) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.index.get(key) {
            if let Some(entry) = inner.list.get_mut(idx) {
                entry.refresh(value, ttl, tags, now);
                inner.list.move_to_front(idx);
                return;
            }
        }

        let entry = CacheEntry::new(key.to_string(), value, ttl, tags, now);
        let idx = inner.list.push_front(entry);
        inner.index.insert(key.to_string(), idx);
        inner.evict_overflow(self.capacity);
    }

    // == Get ==
    /// Retrieves and decodes a value.
    ///
    /// Expired entries are removed and reported as `NotFound`. A value that
    /// cannot be decoded as `T` yields `Decode`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.get_bytes(key)?;
        self.codec.decode(&bytes)
    }

    /// Retrieves a copy of the stored bytes and marks the entry most recently used.
    pub fn get_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let Some(idx) = inner.lookup_live(key, now) else {
            inner.stats.record_miss();
            return Err(CacheError::NotFound(key.to_string()));
        };

        inner.list.move_to_front(idx);
        inner.stats.record_hit();
        inner
            .list
            .get(idx)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Remove ==
    /// Removes an entry. Absent keys are ignored.
    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.lock();
        if let Some(idx) = inner.index.get(key).copied() {
            inner.remove_slot(idx);
        }
    }

    // == Exists ==
    /// Reports whether a live entry exists.
    ///
    /// Expired entries are discarded, but recency is left untouched: probing a
    /// key does not protect it from eviction.
    pub fn exists(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.inner.lock().lookup_live(key, now).is_some()
    }

    // == Increment / Decrement ==
    /// Adds one to a stored integer and returns the new value.
    pub fn increment(&self, key: &str) -> Result<i64> {
        self.adjust(key, 1)
    }

    /// Subtracts one from a stored integer and returns the new value.
    pub fn decrement(&self, key: &str) -> Result<i64> {
        self.adjust(key, -1)
    }

    fn adjust(&self, key: &str, delta: i64) -> Result<i64> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let idx = inner
            .lookup_live(key, now)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        let entry = inner
            .list
            .get_mut(idx)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        let updated = parse_integer(&entry.value)
            .and_then(|current| current.checked_add(delta))
            .ok_or_else(|| CacheError::NotInteger(key.to_string()))?;
        entry.value = updated.to_string().into_bytes();

        inner.list.move_to_front(idx);
        Ok(updated)
    }

    // == Tag Operations ==
    /// Returns the keys carrying `tag`, in no particular order.
    ///
    /// Expired entries met during the scan are discarded. Recency is unchanged.
    pub fn get_keys_by_tag(&self, tag: &str) -> Vec<String> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let matched = inner.scan_tags(now, |entry| entry.has_tag(tag));
        matched
            .into_iter()
            .filter_map(|idx| inner.list.get(idx).map(|entry| entry.key.clone()))
            .collect()
    }

    /// Removes every entry tagged `tag`, plus any expired entry. Returns the number removed.
    pub fn remove_by_tag(&self, tag: &str) -> usize {
        self.remove_by_tags(&[tag])
    }

    /// Removes every entry carrying any of `tags`, plus any expired entry.
    ///
    /// Returns the number of entries removed.
    pub fn remove_by_tags(&self, tags: &[&str]) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let before = inner.list.len();

        let matched = inner.scan_tags(now, |entry| entry.has_any_tag(tags));
        for idx in matched {
            inner.remove_slot(idx);
        }
        before - inner.list.len()
    }

    // == Flush ==
    /// Drops every entry.
    pub fn flush(&self) {
        let mut inner = self.inner.lock();
        inner.index.clear();
        inner.list.clear();
    }

    // == Accessors ==
    /// Returns the current number of entries, expired-but-untouched ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries, 0 = unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        inner.stats.snapshot(inner.list.len())
    }

    /// Asserts that index, forward links and backward links agree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let inner = self.inner.lock();
        let forward: Vec<usize> = inner.list.iter().map(|(idx, _)| idx).collect();
        let mut backward = inner.list.handles_from_back();
        backward.reverse();

        assert_eq!(inner.index.len(), inner.list.len(), "index vs size");
        assert_eq!(forward.len(), inner.list.len(), "list nodes vs size");
        assert_eq!(forward, backward, "forward vs backward links");
        for (idx, entry) in inner.list.iter() {
            assert_eq!(inner.index.get(&entry.key), Some(&idx), "index points at node");
        }
        if self.capacity > 0 {
            assert!(inner.list.len() <= self.capacity, "capacity exceeded");
        }
    }
}

impl<C> std::fmt::Debug for BoundedTagCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedTagCache")
            .field("capacity", &self.capacity)
            .field("len", &self.inner.lock().list.len())
            .finish()
    }
}

fn parse_integer(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

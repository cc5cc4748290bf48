//! Memory Driver
//!
//! [`Cacher`] implementation backed by the in-process [`BoundedTagCache`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{BoundedTagCache, CacheStats};
use crate::cacher::Cacher;
use crate::config::Config;
use crate::error::Result;

/// Name the memory driver registers under by default.
pub const MEMORY_CACHER_NAME: &str = "memory";

/// In-process cache driver.
///
/// Operations never suspend; they are `async` only to satisfy [`Cacher`].
#[derive(Debug, Clone)]
pub struct MemoryCacher {
    store: Arc<BoundedTagCache>,
}

impl MemoryCacher {
    /// Creates an unbounded memory cache.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a memory cache holding at most `capacity` entries (0 = unbounded).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_store(Arc::new(BoundedTagCache::new(capacity)))
    }

    /// Creates a memory cache sized from configuration.
    pub fn from_config(config: &Config) -> Self {
        debug!(capacity = config.capacity, "Creating memory cacher");
        Self::with_capacity(config.capacity)
    }

    /// Wraps an existing store, e.g. one built with a custom clock.
    pub fn from_store(store: Arc<BoundedTagCache>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<BoundedTagCache> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

impl Default for MemoryCacher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cacher for MemoryCacher {
    fn name(&self) -> &str {
        MEMORY_CACHER_NAME
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<()> {
        self.store.set_bytes(key, value, ttl, tags);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.store.get_bytes(key)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        Ok(())
    }

    async fn remove_by_tag(&self, tag: &str) -> Result<()> {
        let removed = self.store.remove_by_tag(tag);
        debug!(tag, removed, "Removed entries by tag");
        Ok(())
    }

    async fn remove_by_tags(&self, tags: &[&str]) -> Result<()> {
        let removed = self.store.remove_by_tags(tags);
        debug!(?tags, removed, "Removed entries by tags");
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.exists(key))
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        self.store.increment(key)
    }

    async fn decrement(&self, key: &str) -> Result<i64> {
        self.store.decrement(key)
    }

    async fn get_keys_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        Ok(self.store.get_keys_by_tag(tag))
    }

    async fn flush(&self) -> Result<()> {
        self.store.flush();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

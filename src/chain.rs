//! Chained Cache
//!
//! Treats an ordered list of registered cachers as one: writes go to every
//! member, reads stop at the first hit, and a fallback cacher answers when the
//! whole chain misses.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::cacher::Cacher;
use crate::error::{CacheError, Result};
use crate::manager::CacheManager;

/// Ordered group of cachers resolved by name through a [`CacheManager`].
///
/// The chain holds a weak handle: once the manager is dropped every operation
/// fails with `Unavailable`.
pub struct ChainedCache {
    manager: Weak<CacheManager>,
    chain: RwLock<Vec<String>>,
    fallback: RwLock<Option<String>>,
}

impl ChainedCache {
    pub fn new(manager: &Arc<CacheManager>) -> Self {
        Self {
            manager: Arc::downgrade(manager),
            chain: RwLock::new(Vec::new()),
            fallback: RwLock::new(None),
        }
    }

    fn manager(&self) -> Result<Arc<CacheManager>> {
        self.manager
            .upgrade()
            .ok_or_else(|| CacheError::Unavailable("cache manager dropped".to_string()))
    }

    // == Manager Delegation ==
    /// Registers a cacher with the underlying manager.
    pub async fn register(&self, name: impl Into<String>, cacher: Arc<dyn Cacher>) -> Result<()> {
        self.manager()?.register(name, cacher).await;
        Ok(())
    }

    pub async fn use_cacher(&self, name: &str) -> Result<Option<Arc<dyn Cacher>>> {
        Ok(self.manager()?.use_cacher(name).await)
    }

    pub async fn current(&self) -> Result<Arc<dyn Cacher>> {
        self.manager()?.current().await
    }

    pub async fn current_name(&self) -> Result<Option<String>> {
        Ok(self.manager()?.current_name().await)
    }

    pub async fn set_current(&self, name: &str) -> Result<()> {
        self.manager()?.set_current(name).await
    }

    // == Chain Membership ==

    /// Appends a cacher name to the end of the chain.
    pub fn add_to_chain(&self, name: impl Into<String>) {
        self.chain.write().push(name.into());
    }

    /// Removes the first occurrence of `name`.
    pub fn remove_from_chain(&self, name: &str) {
        let mut chain = self.chain.write();
        if let Some(pos) = chain.iter().position(|n| n == name) {
            chain.remove(pos);
        }
    }

    /// Cacher consulted by reads when every chain member misses.
    pub fn set_fallback(&self, name: impl Into<String>) {
        *self.fallback.write() = Some(name.into());
    }

    pub fn chain_names(&self) -> Vec<String> {
        self.chain.read().clone()
    }

    /// Builds a new chain over `names` sharing this chain's manager and fallback.
    pub fn override_chain(&self, names: &[&str]) -> ChainedCache {
        Self {
            manager: Weak::clone(&self.manager),
            chain: RwLock::new(names.iter().map(|name| name.to_string()).collect()),
            fallback: RwLock::new(self.fallback.read().clone()),
        }
    }

    async fn members(&self) -> Result<Vec<Arc<dyn Cacher>>> {
        let manager = self.manager()?;
        let names = self.chain_names();
        let mut members = Vec::with_capacity(names.len());
        for name in &names {
            members.push(manager.lookup(name).await?);
        }
        Ok(members)
    }

    async fn fallback(&self) -> Result<Option<Arc<dyn Cacher>>> {
        let name = self.fallback.read().clone();
        match name {
            Some(name) => Ok(Some(self.manager()?.lookup(&name).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Cacher for ChainedCache {
    fn name(&self) -> &str {
        "chain"
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<()> {
        let mut errors = Vec::new();
        for member in self.members().await? {
            if let Err(err) = member.set(key, value.clone(), ttl, tags).await {
                errors.push(err);
            }
        }
        CacheError::aggregate(errors)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        for member in self.members().await? {
            match member.get(key).await {
                Ok(value) => return Ok(value),
                Err(err) => debug!(cacher = member.name(), error = %err, "Chain miss"),
            }
        }
        match self.fallback().await? {
            Some(fallback) => fallback.get(key).await,
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut errors = Vec::new();
        for member in self.members().await? {
            if let Err(err) = member.remove(key).await {
                errors.push(err);
            }
        }
        CacheError::aggregate(errors)
    }

    async fn remove_by_tag(&self, tag: &str) -> Result<()> {
        let mut errors = Vec::new();
        for member in self.members().await? {
            if let Err(err) = member.remove_by_tag(tag).await {
                errors.push(err);
            }
        }
        CacheError::aggregate(errors)
    }

    async fn remove_by_tags(&self, tags: &[&str]) -> Result<()> {
        let mut errors = Vec::new();
        for member in self.members().await? {
            if let Err(err) = member.remove_by_tags(tags).await {
                errors.push(err);
            }
        }
        CacheError::aggregate(errors)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        for member in self.members().await? {
            if let Ok(true) = member.exists(key).await {
                return Ok(true);
            }
        }
        match self.fallback().await? {
            Some(fallback) => fallback.exists(key).await,
            None => Ok(false),
        }
    }

    /// Increments in every member; returns the first member's new value.
    async fn increment(&self, key: &str) -> Result<i64> {
        let mut errors = Vec::new();
        let mut first = None;
        for member in self.members().await? {
            match member.increment(key).await {
                Ok(value) => {
                    first.get_or_insert(value);
                }
                Err(err) => errors.push(err),
            }
        }
        CacheError::aggregate(errors)?;
        first.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Decrements in every member; returns the first member's new value.
    async fn decrement(&self, key: &str) -> Result<i64> {
        let mut errors = Vec::new();
        let mut first = None;
        for member in self.members().await? {
            match member.decrement(key).await {
                Ok(value) => {
                    first.get_or_insert(value);
                }
                Err(err) => errors.push(err),
            }
        }
        CacheError::aggregate(errors)?;
        first.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Union of member results; the fallback answers only if that union is empty.
    async fn get_keys_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for member in self.members().await? {
            if let Ok(found) = member.get_keys_by_tag(tag).await {
                keys.extend(found.into_iter().filter(|key| seen.insert(key.clone())));
            }
        }
        if keys.is_empty() {
            if let Some(fallback) = self.fallback().await? {
                return fallback.get_keys_by_tag(tag).await;
            }
        }
        Ok(keys)
    }

    async fn flush(&self) -> Result<()> {
        let mut errors = Vec::new();
        for member in self.members().await? {
            if let Err(err) = member.flush().await {
                errors.push(err);
            }
        }
        CacheError::aggregate(errors)
    }

    async fn ping(&self) -> Result<()> {
        self.manager()?.ping().await
    }

    async fn close(&self) -> Result<()> {
        self.manager()?.close().await
    }
}

//! Backend interface shared by every cache driver and by the manager layer.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{Codec, JsonCodec};
use crate::error::Result;

/// Cache backend operating on encoded bytes.
///
/// Implemented by the memory driver, by [`CacheManager`](crate::CacheManager)
/// and by [`ChainedCache`](crate::ChainedCache), so any of them can stand in
/// for another.
#[async_trait]
pub trait Cacher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Stores `value` under `key`; `None` or zero `ttl` never expires.
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<()>;

    /// Returns the stored bytes or `NotFound`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Deletes a key; deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    async fn remove_by_tag(&self, tag: &str) -> Result<()>;

    async fn remove_by_tags(&self, tags: &[&str]) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Adds one to an integer value and returns the result.
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Subtracts one from an integer value and returns the result.
    async fn decrement(&self, key: &str) -> Result<i64>;

    async fn get_keys_by_tag(&self, tag: &str) -> Result<Vec<String>>;

    /// Drops every entry held by this backend.
    async fn flush(&self) -> Result<()>;

    /// Reports whether the backend is reachable.
    async fn ping(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Typed access on top of any [`Cacher`], encoded as JSON.
#[async_trait]
pub trait CacherExt: Cacher {
    async fn set_value<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let bytes = JsonCodec.encode(value)?;
        self.set(key, bytes, ttl, tags).await
    }

    async fn get_value<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let bytes = self.get(key).await?;
        JsonCodec.decode(&bytes)
    }
}

impl<C: Cacher + ?Sized> CacherExt for C {}

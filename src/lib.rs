//! Tagcache - A cache abstraction with a bounded in-memory store
//!
//! Provides LRU eviction, tag-based invalidation and lazy TTL expiration,
//! plus a manager and chain layer for composing several backends.

pub mod cache;
pub mod cacher;
pub mod chain;
pub mod config;
pub mod error;
pub mod helpers;
pub mod manager;
pub mod memory;

pub use cache::BoundedTagCache;
pub use cacher::{Cacher, CacherExt};
pub use chain::ChainedCache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use helpers::hash_key;
pub use manager::{CacheManager, CircuitBreaker};
pub use memory::MemoryCacher;

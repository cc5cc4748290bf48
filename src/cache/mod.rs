//! Cache Module
//!
//! In-process bounded cache with LRU eviction, tag-based group operations
//! and lazy TTL expiration.

mod clock;
mod codec;
mod entry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Codec, JsonCodec};
pub use entry::CacheEntry;
pub use lru::RecencyList;
pub use stats::CacheStats;
pub use store::BoundedTagCache;

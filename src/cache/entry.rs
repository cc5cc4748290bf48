//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with tags and TTL support.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// Represents a single cache entry with its encoded value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key the entry is indexed under
    pub key: String,
    /// Encoded value, opaque to the store
    pub value: Vec<u8>,
    /// Deduplicated tags in first-seen order
    pub tags: Vec<String>,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `key` - Key the entry belongs to
    /// * `value` - Encoded value bytes
    /// * `ttl` - Optional TTL; `None` or zero never expires
    /// * `tags` - Tags, duplicates are dropped
    /// * `now` - Current time from the store's clock
    pub fn new(
        key: String,
        value: Vec<u8>,
        ttl: Option<Duration>,
        tags: &[&str],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            value,
            tags: dedup_tags(tags),
            expires_at: expiry_from(ttl, now),
        }
    }

    // == Refresh ==
    /// Replaces value, tags and expiry of an existing entry in place.
    pub fn refresh(
        &mut self,
        value: Vec<u8>,
        ttl: Option<Duration>,
        tags: &[&str],
        now: DateTime<Utc>,
    ) {
        self.value = value;
        self.tags = dedup_tags(tags);
        self.expires_at = expiry_from(ttl, now);
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once `now >= expires_at`, so a TTL that has fully
    /// elapsed is never served.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Checks membership of any of the given tags.
    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.has_tag(tag))
    }
}

// == Utility Functions ==
fn dedup_tags(tags: &[&str]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.iter().any(|t| t == tag) {
            unique.push((*tag).to_string());
        }
    }
    unique
}

fn expiry_from(ttl: Option<Duration>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let ttl = ttl.filter(|ttl| !ttl.is_zero())?;
    // A TTL too large for chrono is treated as "never expires"
    let ttl = chrono::Duration::from_std(ttl).ok()?;
    now.checked_add_signed(ttl)
}

//! Cache Statistics Module
//!
//! Counters kept under the store lock and handed out as snapshots.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of store activity since creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// `get` calls that returned a value
    pub hits: u64,
    /// `get` calls on absent or expired keys
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Expired entries discarded on touch or during a tag scan
    pub expirations: u64,
    /// Live and not-yet-discarded entries at snapshot time
    pub total_entries: usize,
}

impl CacheStats {
    /// Number of `get` calls observed.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups that hit, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub(crate) fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    /// Copies the counters, stamping the entry count.
    pub(crate) fn snapshot(&self, total_entries: usize) -> Self {
        Self {
            total_entries,
            ..self.clone()
        }
    }
}

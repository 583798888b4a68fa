//! Cache Statistics Module
//!
//! Snapshot of the memory tier plus hit, miss, eviction and promotion counters.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

// == Cache Stats ==
/// Memory-tier statistics. The persistent tier is not reflected here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of entries currently held in memory
    pub memory_items: usize,
    /// Sum of the serialized payload lengths of all memory entries
    pub memory_size: usize,
    /// Creation time of the oldest memory entry
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Number of lookups answered from either tier
    pub hits: u64,
    /// Number of lookups that found nothing live
    pub misses: u64,
    /// Number of entries dropped from memory by the capacity bound
    pub evictions: u64,
    /// Number of entries copied from the persistent tier into memory
    pub promotions: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_promotion(&mut self) {
        self.promotions += 1;
    }

    // == Oldest Entry ==
    /// Sets `oldest_entry` from a Unix millisecond timestamp.
    pub fn set_oldest_entry_ms(&mut self, created_at: Option<u64>) {
        self.oldest_entry = created_at.and_then(|ms| {
            i64::try_from(ms)
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        });
    }
}

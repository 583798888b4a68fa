//! Memory Table Module
//!
//! The in-memory tier: a HashMap of entries with TTL checks, a bounded
//! item count and insertion-ordered eviction.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheStats, Payload};

// == Slot ==
/// A memory entry plus its insertion sequence, used to break
/// `created_at` ties during eviction.
#[derive(Debug, Clone)]
struct Slot {
    entry: CacheEntry<Payload>,
    seq: u64,
    /// Payload size measured once at insert
    size: usize,
}

// == Memory Lookup ==
/// Outcome of probing the memory tier for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryLookup {
    /// Entry present and live
    Live(Payload),
    /// Entry was present but expired; it has been dropped
    Expired,
    /// No entry under this key
    Absent,
}

// == Memory Table ==
/// In-memory tier bounded by item count.
#[derive(Debug)]
pub struct MemoryTable {
    /// Key-value storage
    entries: HashMap<String, Slot>,
    /// Next insertion sequence number
    next_seq: u64,
    /// Hit, miss, eviction and promotion counters
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_items: usize,
}

impl MemoryTable {
    // == Constructor ==
    /// Creates an empty table holding at most `max_items` entries.
    pub fn new(max_items: usize) -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
            stats: CacheStats::new(),
            max_items,
        }
    }

    // == Insert ==
    /// Stores an entry, replacing any previous one under the same key, then
    /// enforces the capacity bound.
    ///
    /// Returns the keys evicted to make room, oldest first.
    pub fn insert(&mut self, key: String, entry: CacheEntry<Payload>) -> Vec<String> {
        let seq = self.next_seq;
        self.next_seq += 1;
        let size = entry.data.size();
        self.entries.insert(key, Slot { entry, seq, size });
        self.evict_overflow()
    }

    // == Lookup ==
    /// Probes the table at `now_ms`. Expired entries are removed on discovery.
    pub fn lookup(&mut self, key: &str, now_ms: u64) -> MemoryLookup {
        match self.entries.get(key) {
            Some(slot) if slot.entry.is_expired_at(now_ms) => {
                self.entries.remove(key);
                MemoryLookup::Expired
            }
            Some(slot) => MemoryLookup::Live(slot.entry.data.clone()),
            None => MemoryLookup::Absent,
        }
    }

    // == Remove ==
    /// Removes an entry by key. Returns true if something was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Drops every entry. Returns how many were held.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    // == Remove Matching ==
    /// Removes every entry whose key contains `pattern` as a literal substring.
    ///
    /// Returns the removed keys.
    pub fn remove_matching(&mut self, pattern: &str) -> Vec<String> {
        let matched: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.contains(pattern))
            .cloned()
            .collect();

        for key in &matched {
            self.entries.remove(key);
        }

        matched
    }

    // == Purge Expired ==
    /// Removes all entries expired at `now_ms`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, now_ms: u64) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired_at(now_ms))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
        }

        expired_keys.len()
    }

    // == Evict Overflow ==
    /// Sorts entries by age and drops the oldest until the table fits.
    fn evict_overflow(&mut self) -> Vec<String> {
        if self.entries.len() <= self.max_items {
            return Vec::new();
        }

        let mut by_age: Vec<(u64, u64, &String)> = self
            .entries
            .iter()
            .map(|(key, slot)| (slot.entry.created_at, slot.seq, key))
            .collect();
        by_age.sort_unstable();

        let overflow = self.entries.len() - self.max_items;
        let victims: Vec<String> = by_age
            .into_iter()
            .take(overflow)
            .map(|(_, _, key)| key.clone())
            .collect();

        for key in &victims {
            self.entries.remove(key);
            self.stats.record_eviction();
        }

        victims
    }

    pub fn record_hit(&mut self) {
        self.stats.record_hit();
    }

    pub fn record_miss(&mut self) {
        self.stats.record_miss();
    }

    pub fn record_promotion(&mut self) {
        self.stats.record_promotion();
    }

    // == Stats ==
    /// Returns a statistics snapshot of the table.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.memory_items = self.entries.len();
        stats.memory_size = self.entries.values().map(|slot| slot.size).sum();
        stats.set_oldest_entry_ms(
            self.entries
                .values()
                .map(|slot| slot.entry.created_at)
                .min(),
        );
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Contains ==
    /// Checks for a key without regard to expiry.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

//! Cache Service Module
//!
//! The two-tier cache engine: a bounded memory table in front of an optional
//! persistent mirror, with TTL expiry, coalesced populate-on-miss and
//! substring invalidation.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::flight::SingleFlight;
use crate::cache::table::{MemoryLookup, MemoryTable};
use crate::cache::{CacheEntry, CacheStats, Clock, Payload, SystemClock, Ttl};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::storage::KeyValueStore;

// == Lookup ==
/// Where a key currently lives.
#[derive(Debug)]
enum Lookup {
    /// Live in memory
    Memory(Payload),
    /// Live in the persistent tier only, awaiting promotion
    Persisted(CacheEntry<Value>),
    /// Found in the persistent tier but expired or unreadable, awaiting cleanup
    Expired,
    /// Nowhere
    Absent,
}

// == Cache Service ==
/// Two-tier cache. Construct once at startup and share through an `Arc`.
pub struct CacheService {
    config: CacheConfig,
    memory: RwLock<MemoryTable>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    flights: SingleFlight,
}

impl CacheService {
    // == Constructors ==
    /// Creates a cache over `store` using the system clock.
    pub fn new(config: CacheConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Creates a cache with an explicit time source.
    pub fn with_clock(
        config: CacheConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            memory: RwLock::new(MemoryTable::new(config.max_memory_items)),
            config,
            store,
            clock,
            flights: SingleFlight::new(),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Returns the live value stored under `key`, or None on a miss.
    ///
    /// Memory is checked first. On a memory miss the persistent tier is
    /// consulted; a live persisted entry is promoted into memory and an
    /// expired one is deleted from the store.
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        let Some(payload) = self.resolve(key).await else {
            self.memory_mut().record_miss();
            debug!(key, "Cache miss");
            return None;
        };
        self.memory_mut().record_hit();
        decode(key, payload)
    }

    // == Set ==
    /// Stores `data` under `key` for `ttl` (config default when None).
    ///
    /// The memory write always happens, even for values without a JSON form;
    /// those are kept as an owned copy of the caller's type. The entry is
    /// mirrored to the store only when persistence is on and the TTL exceeds
    /// the short threshold. Otherwise any older mirror of the key is deleted
    /// so it cannot resurface once the new entry is gone. Encoding and store
    /// failures are logged, never returned.
    pub async fn set<T>(&self, key: &str, data: &T, ttl: Option<Ttl>)
    where
        T: Serialize + ToOwned + ?Sized,
        T::Owned: Send + Sync + 'static,
    {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let now = self.clock.now_ms();

        let entry = match serde_json::to_value(data) {
            Ok(value) => CacheEntry::new(Payload::Json(value), now, ttl),
            Err(err) => {
                if self.should_persist(ttl) {
                    error!(key, error = %err, "Failed to encode cache entry for persistence");
                } else {
                    debug!(key, error = %err, "Caching value without a JSON form");
                }
                CacheEntry::new(Payload::native(data.to_owned()), now, ttl)
            }
        };

        let envelope = if self.should_persist(ttl) {
            self.envelope(key, &entry)
        } else {
            None
        };

        let evicted = self.memory_mut().insert(key.to_string(), entry);
        if !evicted.is_empty() {
            debug!(count = evicted.len(), ?evicted, "Evicted oldest memory entries");
        }

        if self.config.persist_to_storage {
            let store_key = self.store_key(key);
            match envelope {
                Some(raw) => {
                    if let Err(err) = self.store.set_item(&store_key, raw).await {
                        error!(key, error = %err, "Failed to persist cache entry");
                    }
                }
                None => {
                    if let Err(err) = self.store.remove_item(&store_key).await {
                        error!(key, error = %err, "Failed to drop superseded persisted entry");
                    }
                }
            }
        }

        debug!(key, ?ttl, "Cache set");
    }

    // == Remove ==
    /// Deletes `key` from both tiers. Removing an absent key is a no-op.
    ///
    /// With persistence disabled the store is left alone: nothing is written
    /// to it or read from it in that mode, so there is no copy to delete.
    pub async fn remove(&self, key: &str) {
        let removed = self.memory_mut().remove(key);

        if self.config.persist_to_storage {
            if let Err(err) = self.store.remove_item(&self.store_key(key)).await {
                error!(key, error = %err, "Failed to remove persisted cache entry");
            }
        }

        debug!(key, removed, "Cache remove");
    }

    // == Clear ==
    /// Empties memory and deletes every persisted key under this cache's
    /// prefix in a single batch.
    pub async fn clear(&self) {
        let cleared = self.memory_mut().clear();

        let persisted = if self.config.persist_to_storage {
            self.remove_persisted_where(|_| true).await
        } else {
            0
        };

        info!(memory = cleared, persisted, "Cache cleared");
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// result.
    ///
    /// `fetch` never runs on a hit and runs at most once per call. Concurrent
    /// callers missing on the same key queue behind the first one and reuse
    /// what it stored. An error from `fetch` is returned unchanged and nothing
    /// is cached. Each call counts as exactly one hit or one miss.
    pub async fn get_or_set<T, F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        ttl: Option<Ttl>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(hit) = self.cached::<T>(key).await {
            self.memory_mut().record_hit();
            return Ok(hit);
        }

        let _flight = self.flights.enter(key).await;

        // Someone else may have populated the key while we queued.
        if let Some(hit) = self.cached::<T>(key).await {
            self.memory_mut().record_hit();
            return Ok(hit);
        }

        self.memory_mut().record_miss();
        debug!(key, "Fetching value for cache miss");
        let data = fetch().await?;
        self.set(key, &data, ttl).await;

        Ok(data)
    }

    // == Invalidate Pattern ==
    /// Removes every entry whose key contains `pattern` literally.
    ///
    /// Matching is done against the caller's key, not the namespaced store
    /// key. An empty pattern matches everything.
    pub async fn invalidate_pattern(&self, pattern: &str) {
        let removed = self.memory_mut().remove_matching(pattern);

        let persisted = if self.config.persist_to_storage {
            self.remove_persisted_where(|key| key.contains(pattern)).await
        } else {
            0
        };

        info!(
            pattern,
            memory = removed.len(),
            persisted,
            "Invalidated cache entries by pattern"
        );
    }

    // == Stats ==
    /// Snapshot of the memory tier.
    pub fn stats(&self) -> CacheStats {
        self.memory().stats()
    }

    // == Purge Expired ==
    /// Drops expired entries from memory. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        self.memory_mut().purge_expired(now)
    }

    // == Lookup Steps ==
    /// Finds the live payload for `key`, performing promotion and lazy
    /// cleanup.
    async fn resolve(&self, key: &str) -> Option<Payload> {
        match self.lookup(key).await {
            Lookup::Memory(payload) => {
                debug!(key, "Cache hit (memory)");
                Some(payload)
            }
            Lookup::Persisted(entry) => {
                debug!(key, "Cache hit (storage)");
                let entry = entry.map(Payload::Json);
                let payload = entry.data.clone();
                self.promote(key, entry);
                Some(payload)
            }
            Lookup::Expired => {
                self.discard_persisted(key).await;
                None
            }
            Lookup::Absent => None,
        }
    }

    async fn lookup(&self, key: &str) -> Lookup {
        let now = self.clock.now_ms();

        let probe = self.memory_mut().lookup(key, now);
        match probe {
            MemoryLookup::Live(payload) => return Lookup::Memory(payload),
            MemoryLookup::Expired => debug!(key, "Memory entry expired"),
            MemoryLookup::Absent => {}
        }

        if !self.config.persist_to_storage {
            return Lookup::Absent;
        }

        let raw = match self.store.get_item(&self.store_key(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Absent,
            Err(err) => {
                error!(key, error = %err, "Failed to read persisted cache entry");
                return Lookup::Absent;
            }
        };

        match CacheEntry::from_envelope(&raw) {
            Ok(entry) if entry.is_expired_at(now) => Lookup::Expired,
            Ok(entry) => Lookup::Persisted(entry),
            Err(err) => {
                warn!(key, error = %err, "Discarding unreadable persisted entry");
                Lookup::Expired
            }
        }
    }

    /// Resolves and decodes without touching the hit/miss counters.
    async fn cached<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Clone + 'static,
    {
        let payload = self.resolve(key).await?;
        decode(key, payload)
    }

    fn promote(&self, key: &str, entry: CacheEntry<Payload>) {
        let mut memory = self.memory_mut();
        let evicted = memory.insert(key.to_string(), entry);
        memory.record_promotion();
        if !evicted.is_empty() {
            debug!(count = evicted.len(), ?evicted, "Evicted oldest memory entries");
        }
    }

    async fn discard_persisted(&self, key: &str) {
        if let Err(err) = self.store.remove_item(&self.store_key(key)).await {
            error!(key, error = %err, "Failed to remove expired persisted entry");
        }
    }

    /// Batch-deletes persisted keys under the prefix whose un-prefixed part
    /// satisfies `matches`. Returns the number of keys deleted.
    async fn remove_persisted_where<P>(&self, matches: P) -> usize
    where
        P: Fn(&str) -> bool,
    {
        let keys = match self.store.get_all_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                error!(error = %err, "Failed to list persisted cache keys");
                return 0;
            }
        };

        let prefix = self.config.key_prefix.as_str();
        let targets: Vec<String> = keys
            .into_iter()
            .filter(|key| key.strip_prefix(prefix).is_some_and(&matches))
            .collect();

        if targets.is_empty() {
            return 0;
        }

        match self.store.multi_remove(&targets).await {
            Ok(()) => targets.len(),
            Err(err) => {
                error!(count = targets.len(), error = %err, "Failed to remove persisted cache keys");
                0
            }
        }
    }

    // == Helpers ==
    fn store_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    fn should_persist(&self, ttl: Ttl) -> bool {
        self.config.persist_to_storage && ttl.exceeds(self.config.short_ttl_threshold)
    }

    /// Envelope text for `entry`, or None when it has no JSON form.
    fn envelope(&self, key: &str, entry: &CacheEntry<Payload>) -> Option<String> {
        let value = entry.data.as_json()?;
        let mirrored = CacheEntry {
            data: value,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        };
        match mirrored.to_envelope() {
            Ok(raw) => Some(raw),
            Err(err) => {
                error!(key, error = %err, "Failed to encode cache entry for persistence");
                None
            }
        }
    }

    /// Read access to the memory table.
    fn memory(&self) -> RwLockReadGuard<'_, MemoryTable> {
        self.memory.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the memory table. Callers never hold the guard across an await.
    fn memory_mut(&self) -> RwLockWriteGuard<'_, MemoryTable> {
        self.memory.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("in_flight", &self.flights.in_flight())
            .finish_non_exhaustive()
    }
}

fn decode<T>(key: &str, payload: Payload) -> Option<T>
where
    T: DeserializeOwned + Clone + 'static,
{
    match payload {
        Payload::Json(value) => match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(key, error = %err, "Cached value does not match requested type");
                None
            }
        },
        Payload::Native { value, .. } => {
            let data = value.downcast_ref::<T>().cloned();
            if data.is_none() {
                warn!(key, "Cached value does not match requested type");
            }
            data
        }
    }
}

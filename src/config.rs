//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::Ttl;
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a caller does not pass one
    pub default_ttl: Ttl,
    /// Hard cap on the number of entries held in memory
    pub max_memory_items: usize,
    /// Whether entries are mirrored to the persistent store at all
    pub persist_to_storage: bool,
    /// Namespace prepended to every persistent-store key
    pub key_prefix: String,
    /// Entries whose TTL does not exceed this are kept in memory only
    pub short_ttl_threshold: Duration,
    /// Interval between background sweeps of expired memory entries
    pub cleanup_interval: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in ms, or `permanent` (default: 300000)
    /// - `CACHE_MAX_MEMORY_ITEMS` - Memory capacity (default: 100)
    /// - `CACHE_PERSIST` - `true`/`false` (default: true)
    /// - `CACHE_KEY_PREFIX` - Store namespace (default: `@cache_`)
    /// - `CACHE_SHORT_TTL_MS` - Persistence threshold in ms (default: 60000)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Sweep interval in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| parse_ttl(&v))
                .unwrap_or(defaults.default_ttl),
            max_memory_items: env::var("CACHE_MAX_MEMORY_ITEMS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_memory_items),
            persist_to_storage: env::var("CACHE_PERSIST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.persist_to_storage),
            key_prefix: env::var("CACHE_KEY_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.key_prefix),
            short_ttl_threshold: env::var("CACHE_SHORT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.short_ttl_threshold),
            cleanup_interval: env::var("CACHE_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    // == Validate ==
    /// Rejects settings the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_memory_items == 0 {
            return Err(CacheError::Config(
                "max_memory_items must be at least 1".to_string(),
            ));
        }
        if self.persist_to_storage && self.key_prefix.is_empty() {
            return Err(CacheError::Config(
                "key_prefix must not be empty when persistence is enabled".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::Config(
                "cleanup_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Ttl::MEDIUM,
            max_memory_items: 100,
            persist_to_storage: true,
            key_prefix: "@cache_".to_string(),
            short_ttl_threshold: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

fn parse_ttl(raw: &str) -> Option<Ttl> {
    if raw.eq_ignore_ascii_case("permanent") {
        return Some(Ttl::Permanent);
    }
    raw.parse().ok().map(Ttl::from_millis)
}

//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from the
//! memory tier. Expired persisted entries are still cleaned up lazily on
//! lookup.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheService;

/// Spawns a background task that periodically purges expired memory entries.
///
/// The task runs in an infinite loop, sleeping for `interval` between runs.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheService::new(config, store)?);
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<CacheService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "Starting TTL cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, Ttl};
    use crate::config::CacheConfig;
    use crate::storage::MemoryStore;

    fn memory_only_cache(clock: Arc<ManualClock>) -> Arc<CacheService> {
        let config = CacheConfig {
            persist_to_storage: false,
            ..CacheConfig::default()
        };
        Arc::new(CacheService::with_clock(config, Arc::new(MemoryStore::new()), clock).unwrap())
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = memory_only_cache(clock.clone());

        cache.set("expire_soon", "value", Some(Ttl::from_millis(1_000))).await;
        cache.set("long_lived", "value", Some(Ttl::LONG)).await;
        clock.advance(Duration::from_secs(2));

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(100)).await;

        let stats = cache.stats();
        assert_eq!(stats.memory_items, 1, "Expired entry should have been purged");
        assert_eq!(
            cache.get::<String>("long_lived").await.as_deref(),
            Some("value")
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = memory_only_cache(Arc::new(ManualClock::new(0)));

        let handle = spawn_cleanup_task(cache, Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}

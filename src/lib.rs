//! Travel Cache - A two-tier client-side cache
//!
//! Keeps hot data in a bounded in-memory table with TTL expiry and mirrors
//! longer-lived entries into a pluggable persistent key-value store.

pub mod cache;
pub mod config;
pub mod error;
pub mod storage;
pub mod tasks;

pub use cache::{CacheService, CacheStats, Ttl};
pub use config::CacheConfig;
pub use error::{CacheError, StoreError};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use tasks::spawn_cleanup_task;

//! Storage Module
//!
//! The persistent key-value capability the cache mirrors entries into,
//! plus the adapters shipped with the crate.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Convenience Result type for store backends.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Key-Value Store ==
/// An async string-keyed, string-valued store.
///
/// The store knows nothing about cache semantics; the engine serializes its
/// own entries before handing them over. Implementations may be shared with
/// unrelated data, so callers namespace their keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set_item(&self, key: &str, value: String) -> StoreResult<()>;
    /// Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> StoreResult<()>;
    async fn get_all_keys(&self) -> StoreResult<Vec<String>>;
    /// Removes a batch of keys in one operation.
    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()>;
}

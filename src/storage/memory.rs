//! In-process store backed by a HashMap.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, StoreResult};

// == Memory Store ==
/// A volatile store. Contents live as long as the value does, which makes it
/// suitable for tests and for sharing one "disk" between cache instances.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently stored.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> StoreResult<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn get_all_keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.items.read().await.keys().cloned().collect())
    }

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        let mut items = self.items.write().await;
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();

        store.set_item("a", "1".to_string()).await.unwrap();
        assert_eq!(store.get_item("a").await.unwrap(), Some("1".to_string()));

        store.remove_item("a").await.unwrap();
        assert_eq!(store.get_item("a").await.unwrap(), None);

        // Removing again is fine
        store.remove_item("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_multi_remove_leaves_other_keys() {
        let store = MemoryStore::new();
        for key in ["x", "y", "z"] {
            store.set_item(key, key.to_string()).await.unwrap();
        }

        store
            .multi_remove(&["x".to_string(), "z".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(store.get_all_keys().await.unwrap(), vec!["y".to_string()]);
        assert_eq!(store.len().await, 1);
    }
}

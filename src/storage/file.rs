//! Single-file JSON store.
//!
//! The whole map is kept in memory and rewritten to disk after every
//! mutation through a temporary file and a rename, so a crash mid-write
//! leaves the previous file intact.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{KeyValueStore, StoreResult};

// == File Store ==
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    // == Open ==
    /// Opens the store at `path`, loading existing contents.
    ///
    /// A missing file yields an empty store; missing parent directories are
    /// created.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let items = match fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), items = items.len(), "Opened file store");

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Mutate ==
    /// Applies `change` to a copy of the map, writes it out, and only then
    /// makes it visible. A failed write leaves memory and disk in agreement.
    async fn mutate<F>(&self, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut items = self.items.lock().await;
        let mut next = items.clone();
        change(&mut next);
        self.flush(&next).await?;
        *items = next;
        Ok(())
    }

    async fn flush(&self, items: &BTreeMap<String, String>) -> StoreResult<()> {
        let bytes = serde_json::to_vec(items)?;

        let mut tmp: OsString = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> StoreResult<()> {
        let key = key.to_string();
        self.mutate(move |items| {
            items.insert(key, value);
        })
        .await
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        if !self.items.lock().await.contains_key(key) {
            return Ok(());
        }
        self.mutate(|items| {
            items.remove(key);
        })
        .await
    }

    async fn get_all_keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.items.lock().await.keys().cloned().collect())
    }

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.mutate(|items| {
            for key in keys {
                items.remove(key);
            }
        })
        .await
    }
}

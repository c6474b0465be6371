//! Durable key/value storage backends for the type cache

use crate::error::{TypeLoadError, TypeLoadResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

/// String key/value store the cache persists records into
///
/// Keys handed to a store are always sanitized (`[A-Za-z0-9_-]`), so
/// backends may use them directly as file or column names.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the raw value stored under `key`
    async fn get(&self, key: &str) -> TypeLoadResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String) -> TypeLoadResult<()>;

    /// Remove `key` (no-op if absent)
    async fn remove(&self, key: &str) -> TypeLoadResult<()>;

    /// List every key in the store, including keys of other namespaces
    async fn keys(&self) -> TypeLoadResult<Vec<String>>;
}

/// One JSON file per key inside a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a file store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> TypeLoadResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| TypeLoadError::io(format!("creating cache dir {}", dir.display()), e))?;
        Ok(Self { dir })
    }

    /// Directory backing this store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> TypeLoadResult<Option<String>> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TypeLoadError::storage(key, format!("reading: {}", e))),
        }
    }

    async fn set(&self, key: &str, value: String) -> TypeLoadResult<()> {
        let path = self.entry_path(key);
        fs::write(&path, value)
            .await
            .map_err(|e| TypeLoadError::storage(key, format!("writing: {}", e)))
    }

    async fn remove(&self, key: &str) -> TypeLoadResult<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TypeLoadError::storage(key, format!("removing: {}", e))),
        }
    }

    async fn keys(&self) -> TypeLoadResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| TypeLoadError::io("reading cache directory", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TypeLoadError::io("reading cache entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }

        Ok(keys)
    }
}

/// In-process store with an optional byte quota
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Create an unbounded memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once `bytes` would be exceeded
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota_bytes: Some(bytes),
        }
    }

    fn lock(&self) -> TypeLoadResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| TypeLoadError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> TypeLoadResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> TypeLoadResult<()> {
        let mut entries = self.lock()?;
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(TypeLoadError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> TypeLoadResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn keys(&self) -> TypeLoadResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_store_set_get_remove() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path().join("types")).await.unwrap();

        store.set("ns-a", "one".to_string()).await.unwrap();
        assert_eq!(store.get("ns-a").await.unwrap().as_deref(), Some("one"));

        store.remove("ns-a").await.unwrap();
        assert!(store.get("ns-a").await.unwrap().is_none());

        // Removing twice is fine
        store.remove("ns-a").await.unwrap();
    }

    #[tokio::test]
    async fn file_store_lists_json_keys_only() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).await.unwrap();
        store.set("ns-a", "1".to_string()).await.unwrap();
        store.set("other-b", "2".to_string()).await.unwrap();
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["ns-a".to_string(), "other-b".to_string()]);
    }

    #[tokio::test]
    async fn file_store_write_failure_names_key() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("types");
        let store = FileStore::open(&dir).await.unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        let err = store.set("ns-a", "one".to_string()).await.unwrap_err();
        assert!(matches!(err, TypeLoadError::Storage { ref key, .. } if key == "ns-a"));
        assert!(err.to_string().contains("ns-a"));
    }

    #[tokio::test]
    async fn memory_store_quota() {
        let store = MemoryStore::with_quota(16);
        store.set("k", "small".to_string()).await.unwrap();

        let err = store.set("k2", "x".repeat(32)).await.unwrap_err();
        assert!(matches!(err, TypeLoadError::QuotaExceeded { .. }));
        assert!(store.get("k2").await.unwrap().is_none());
    }
}

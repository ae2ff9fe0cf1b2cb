use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::StateStore;

/// In-memory [`StateStore`].
///
/// Directories are implicit: `ensure_dir` is a no-op. Clones share the same
/// underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<PathBuf, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<PathBuf> {
        let mut keys: Vec<_> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove a value, returning it if present.
    pub async fn remove(&self, key: &Path) -> Option<Bytes> {
        self.entries.write().await.remove(key)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn exists(&self, key: &Path) -> bool {
        self.entries.read().await.contains_key(key)
    }

    async fn read(&self, key: &Path) -> std::io::Result<Bytes> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", key.display()),
                )
            })
    }

    async fn write(&self, key: &Path, data: &[u8]) -> std::io::Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_path_buf(), Bytes::copy_from_slice(data));
        Ok(())
    }

    async fn ensure_dir(&self, _key: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

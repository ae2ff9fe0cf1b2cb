use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

/// Key-value view of the persisted pipeline state.
///
/// Keys are paths produced by [`Layout`](super::Layout). Existence of a key
/// is the only progress signal the pipeline relies on; no checksum or size is
/// recorded, so a present key is always trusted.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Whether a value is stored under `key`.
    async fn exists(&self, key: &Path) -> bool;

    /// Read the full value stored under `key`.
    ///
    /// Returns an error of kind `NotFound` when the key is absent.
    async fn read(&self, key: &Path) -> std::io::Result<Bytes>;

    /// Store `data` under `key`, replacing any previous value.
    ///
    /// Implementations must never expose a partially written value: once
    /// [`exists`](Self::exists) reports the key, its content is complete.
    async fn write(&self, key: &Path, data: &[u8]) -> std::io::Result<()>;

    /// Make sure a container for keys under `key` exists.
    async fn ensure_dir(&self, key: &Path) -> std::io::Result<()>;
}

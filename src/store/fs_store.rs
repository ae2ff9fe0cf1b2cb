use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use super::StateStore;

/// Suffix of the temporary file a value is staged in before being renamed.
const PARTIAL_SUFFIX: &str = ".part";

/// Filesystem-backed [`StateStore`]; keys are file paths.
///
/// Writes go to a `.part` sibling first and are renamed into place, so an
/// interrupted run never leaves a truncated file under the final name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl FsStore {
    pub fn new() -> Self {
        Self
    }

    fn partial_path(key: &Path) -> PathBuf {
        let mut name = key
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(PARTIAL_SUFFIX);
        key.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for FsStore {
    async fn exists(&self, key: &Path) -> bool {
        fs::try_exists(key).await.unwrap_or(false)
    }

    async fn read(&self, key: &Path) -> std::io::Result<Bytes> {
        fs::read(key).await.map(Bytes::from)
    }

    async fn write(&self, key: &Path, data: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = key.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = Self::partial_path(key);
        fs::write(&partial, data).await?;
        fs::rename(&partial, key).await
    }

    async fn ensure_dir(&self, key: &Path) -> std::io::Result<()> {
        fs::create_dir_all(key).await
    }
}

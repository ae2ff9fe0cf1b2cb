//! Load-or-fetch access to manuscript and page metadata.
//!
//! Snapshots are the restart mechanism of the whole pipeline. When one
//! exists it is returned verbatim without any remote call; it is never
//! refreshed or invalidated.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::MetadataError;
use crate::model::{ManuscriptMetadata, ManuscriptPageMetadata};
use crate::probe::MagnificationProber;
use crate::store::{Layout, StateStore};
use crate::transport::TileTransport;

/// Where a piece of metadata came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOrigin {
    /// Loaded from a persisted snapshot
    Snapshot,
    /// Fetched from the server during this call
    Remote,
}

/// Load-or-fetch cache for manuscript and page metadata.
pub struct MetadataCache<T: TileTransport> {
    transport: Arc<T>,
    store: Arc<dyn StateStore>,
    layout: Layout,
    prober: MagnificationProber<T>,

    /// Pool bounding in-flight page metadata fetches
    page_info_slots: Arc<Semaphore>,
}

impl<T: TileTransport> MetadataCache<T> {
    pub fn new(
        transport: Arc<T>,
        store: Arc<dyn StateStore>,
        layout: Layout,
        prober: MagnificationProber<T>,
        page_info_slots: Arc<Semaphore>,
    ) -> Self {
        Self {
            transport,
            store,
            layout,
            prober,
            page_info_slots,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Manuscript metadata for the manuscript containing `manuscript_page_id`.
    ///
    /// On a snapshot miss, fetches the page listing and probes the
    /// magnification levels on `manuscript_page_id`. The fetched value is not
    /// persisted here: the caller decides whether it is usable and calls
    /// [`save_manuscript`](Self::save_manuscript).
    pub async fn load_manuscript(
        &self,
        manuscript_page_id: &str,
    ) -> Result<(ManuscriptMetadata, MetadataOrigin), MetadataError> {
        let path = self.layout.manuscript_metadata_path(manuscript_page_id);

        if let Some(metadata) = read_snapshot(self.store.as_ref(), &path).await? {
            warn!(path = %path.display(), "Manuscript metadata exists, loading from file");
            return Ok((metadata, MetadataOrigin::Snapshot));
        }

        let page_id_list = self.transport.fetch_page_list(manuscript_page_id).await?;
        let indices = self.prober.probe(manuscript_page_id).await;
        info!(
            pages = page_id_list.len(),
            ?indices,
            "Fetched manuscript metadata"
        );

        Ok((
            ManuscriptMetadata::new(page_id_list, indices),
            MetadataOrigin::Remote,
        ))
    }

    /// Persist manuscript metadata under `manuscript_page_id`.
    pub async fn save_manuscript(
        &self,
        manuscript_page_id: &str,
        metadata: &ManuscriptMetadata,
    ) -> Result<(), MetadataError> {
        let path = self.layout.manuscript_metadata_path(manuscript_page_id);
        write_snapshot(self.store.as_ref(), &path, metadata).await
    }

    /// Page metadata for `page_id`, fetched and persisted on a snapshot miss.
    ///
    /// The fetch holds one slot of the page metadata pool; the slot is
    /// released as soon as the response arrives.
    pub async fn load_page(&self, page_id: &str) -> Result<ManuscriptPageMetadata, MetadataError> {
        let path = self.layout.page_metadata_path(page_id);

        if let Some(metadata) = read_snapshot(self.store.as_ref(), &path).await? {
            warn!(path = %path.display(), "Page metadata exists, loading from file");
            return Ok(metadata);
        }

        let page = {
            let _permit = self
                .page_info_slots
                .acquire()
                .await
                .map_err(|_| MetadataError::PoolClosed)?;
            self.transport.fetch_page_info(page_id).await?
        };

        write_snapshot(self.store.as_ref(), &path, &page).await?;
        Ok(page)
    }
}

// =============================================================================
// Snapshot Helpers
// =============================================================================

/// Read a JSON snapshot, `None` when no snapshot exists.
pub async fn read_snapshot<M: DeserializeOwned>(
    store: &dyn StateStore,
    path: &Path,
) -> Result<Option<M>, MetadataError> {
    if !store.exists(path).await {
        return Ok(None);
    }

    let data = store.read(path).await.map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| MetadataError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Read a JSON snapshot that must exist.
pub async fn require_snapshot<M: DeserializeOwned>(
    store: &dyn StateStore,
    path: &Path,
) -> Result<M, MetadataError> {
    read_snapshot(store, path)
        .await?
        .ok_or_else(|| MetadataError::NotFound(path.to_path_buf()))
}

/// Write a JSON snapshot.
pub async fn write_snapshot<M: Serialize>(
    store: &dyn StateStore,
    path: &Path,
    metadata: &M,
) -> Result<(), MetadataError> {
    let data = serde_json::to_vec(metadata).map_err(|e| MetadataError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    store
        .write(path, &data)
        .await
        .map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })
}

//! Tile acquisition for one page.
//!
//! Every tile of the page grid is handled by its own future:
//!
//! ```text
//! exists on disk? ──yes──► skip
//!       │ no
//!       ▼
//! acquire download slot ──► sleep jitter ──► fetch ──► write ──► release slot
//! ```
//!
//! The download pool is shared by all pages of a run. The jitter is taken
//! while the slot is held, which throttles the whole run to roughly one
//! pool's worth of requests per jitter window.

use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::AcquireError;
use crate::model::{ManuscriptPageMetadata, TileCoord};
use crate::store::{Layout, StateStore};
use crate::transport::TileTransport;

/// What happened to one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Fetched and written
    Downloaded,
    /// Already present on disk, nothing requested
    Skipped,
    /// Server answered with an empty body, nothing written
    Empty,
}

/// Per-page (or per-run) tile counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub empty: usize,
}

impl AcquisitionSummary {
    fn record(&mut self, outcome: TileOutcome) {
        match outcome {
            TileOutcome::Downloaded => self.downloaded += 1,
            TileOutcome::Skipped => self.skipped += 1,
            TileOutcome::Empty => self.empty += 1,
        }
    }

    /// Tiles examined in total.
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.empty
    }
}

impl AddAssign for AcquisitionSummary {
    fn add_assign(&mut self, other: Self) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.empty += other.empty;
    }
}

/// Downloads the tile grid of a page.
pub struct TileAcquirer<T: TileTransport> {
    transport: Arc<T>,
    store: Arc<dyn StateStore>,
    layout: Layout,

    /// Pool bounding in-flight tile downloads across all pages
    download_slots: Arc<Semaphore>,

    /// Upper bound of the delay taken before each request
    max_jitter: Duration,
}

impl<T: TileTransport> TileAcquirer<T> {
    pub fn new(
        transport: Arc<T>,
        store: Arc<dyn StateStore>,
        layout: Layout,
        download_slots: Arc<Semaphore>,
        max_jitter: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            layout,
            download_slots,
            max_jitter,
        }
    }

    /// Make sure every tile of `page` at zoom level `zoom` is on disk.
    ///
    /// Tiles already present are not requested again. The first download
    /// failure aborts the page: tiles still in flight are dropped and the
    /// error is returned. Tiles written before that stay on disk.
    pub async fn acquire_page(
        &self,
        page: &ManuscriptPageMetadata,
        zoom: u32,
    ) -> Result<AcquisitionSummary, AcquireError> {
        info!(
            page_id = %page.id,
            zoom,
            tiles = page.tile_count(),
            "Fetching all parts of the image"
        );

        let mut pending: FuturesUnordered<_> = page
            .tiles()
            .map(|coord| self.acquire_tile(page, zoom, coord))
            .collect();

        let mut summary = AcquisitionSummary::default();
        while let Some(outcome) = pending.next().await {
            summary.record(outcome?);
        }

        debug!(page_id = %page.id, ?summary, "Page tiles acquired");
        Ok(summary)
    }

    async fn acquire_tile(
        &self,
        page: &ManuscriptPageMetadata,
        zoom: u32,
        coord: TileCoord,
    ) -> Result<TileOutcome, AcquireError> {
        let path = self.layout.tile_path(page, coord);

        if self.store.exists(&path).await {
            debug!(path = %path.display(), "Already fetched");
            return Ok(TileOutcome::Skipped);
        }

        let _permit = self
            .download_slots
            .acquire()
            .await
            .map_err(|_| AcquireError::PoolClosed)?;

        sleep(self.jitter()).await;

        debug!(page_id = %page.id, x = coord.x, y = coord.y, "Starting tile fetch");
        let data = self
            .transport
            .fetch_tile(&page.id, zoom, coord.x, coord.y)
            .await
            .map_err(|source| AcquireError::Tile {
                page_id: page.id.clone(),
                zoom,
                x: coord.x,
                y: coord.y,
                source,
            })?;

        if data.is_empty() {
            warn!(page_id = %page.id, x = coord.x, y = coord.y, "Empty tile response, not written");
            return Ok(TileOutcome::Empty);
        }

        debug!(path = %path.display(), "Writing file");
        self.store
            .write(&path, &data)
            .await
            .map_err(|source| AcquireError::Io { path, source })?;

        Ok(TileOutcome::Downloaded)
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        rand::thread_rng().gen_range(Duration::ZERO..=self.max_jitter)
    }
}

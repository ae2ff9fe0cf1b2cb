//! Manuscript-level acquisition.
//!
//! ```text
//! load_manuscript ──► max magnification ──► save snapshot (if fetched)
//!                                               │
//!          ┌────────────────────────────────────┘
//!          ▼
//!   for each page:  ensure dir ──► load_page ──► spawn acquire_page
//!                                                      │
//!                                       JoinSet (fail-fast) ◄┘
//! ```
//!
//! Pages are launched in listing order and their tile downloads overlap.
//! The first page failure stops launching new pages and aborts the ones
//! still running. Everything already written stays on disk, so a rerun
//! resumes from there.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, info_span, Instrument};

use crate::acquire::{AcquisitionSummary, TileAcquirer};
use crate::config::FetchConfig;
use crate::error::AcquireError;
use crate::metadata::{MetadataCache, MetadataOrigin};
use crate::probe::MagnificationProber;
use crate::store::{Layout, StateStore};
use crate::transport::TileTransport;

/// Totals of one acquisition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Pages in the manuscript
    pub pages: usize,
    /// Zoom level the tiles were requested at
    pub magnification_index: u32,
    pub tiles: AcquisitionSummary,
}

type PageResult = Result<AcquisitionSummary, AcquireError>;

/// Drives metadata loading and tile acquisition for a whole manuscript.
pub struct AcquisitionOrchestrator<T: TileTransport + 'static> {
    store: Arc<dyn StateStore>,
    metadata: MetadataCache<T>,
    acquirer: Arc<TileAcquirer<T>>,
}

impl<T: TileTransport + 'static> AcquisitionOrchestrator<T> {
    /// Build the pipeline with fresh page metadata and download pools sized
    /// from `config`.
    pub fn new(transport: Arc<T>, store: Arc<dyn StateStore>, config: &FetchConfig) -> Self {
        let layout = Layout::new(&config.output_dir);
        let prober = MagnificationProber::with_candidates(
            Arc::clone(&transport),
            config.magnification_candidates.clone(),
        );

        let metadata = MetadataCache::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            layout.clone(),
            prober,
            Arc::new(Semaphore::new(config.metadata_concurrency)),
        );

        let acquirer = TileAcquirer::new(
            transport,
            Arc::clone(&store),
            layout,
            Arc::new(Semaphore::new(config.download_concurrency)),
            config.max_jitter,
        );

        Self {
            store,
            metadata,
            acquirer: Arc::new(acquirer),
        }
    }

    /// Download every tile of every page of the manuscript containing
    /// `manuscript_page_id`, at the highest hosted magnification.
    ///
    /// # Errors
    ///
    /// Returns the first failure. When no magnification level is hosted
    /// nothing is persisted and no page is touched.
    pub async fn run(&self, manuscript_page_id: &str) -> Result<RunSummary, AcquireError> {
        let (manuscript, origin) = self.metadata.load_manuscript(manuscript_page_id).await?;
        let zoom = manuscript.max_magnification_index()?;

        if origin == MetadataOrigin::Remote {
            self.metadata
                .save_manuscript(manuscript_page_id, &manuscript)
                .await?;
        }

        info!(
            pages = manuscript.page_id_list.len(),
            magnification_index = zoom,
            "Fetching manuscript"
        );

        let mut tasks: JoinSet<PageResult> = JoinSet::new();
        let mut tiles = AcquisitionSummary::default();
        let mut failure: Option<AcquireError> = None;

        for page_id in &manuscript.page_id_list {
            if drain_finished(&mut tasks, &mut tiles, &mut failure) {
                break;
            }

            let page_dir = self.metadata.layout().page_dir(page_id);
            if let Err(source) = self.store.ensure_dir(&page_dir).await {
                failure = Some(AcquireError::Io {
                    path: page_dir,
                    source,
                });
                break;
            }

            let page = match self.metadata.load_page(page_id).await {
                Ok(page) => page,
                Err(e) => {
                    failure = Some(e.into());
                    break;
                }
            };

            if drain_finished(&mut tasks, &mut tiles, &mut failure) {
                break;
            }

            let span = info_span!("page", page_id = %page.id);
            let acquirer = Arc::clone(&self.acquirer);
            tasks.spawn(async move { acquirer.acquire_page(&page, zoom).await }.instrument(span));
        }

        if failure.is_some() {
            tasks.abort_all();
        }

        while let Some(joined) = tasks.join_next().await {
            settle(joined, &mut tiles, &mut failure);
            if failure.is_some() {
                tasks.abort_all();
            }
        }

        match failure {
            Some(e) => Err(e),
            None => {
                info!(?tiles, "Manuscript fetched");
                Ok(RunSummary {
                    pages: manuscript.page_id_list.len(),
                    magnification_index: zoom,
                    tiles,
                })
            }
        }
    }
}

/// Collect the pages that already finished. Returns whether any failed.
fn drain_finished(
    tasks: &mut JoinSet<PageResult>,
    tiles: &mut AcquisitionSummary,
    failure: &mut Option<AcquireError>,
) -> bool {
    while let Some(joined) = tasks.try_join_next() {
        settle(joined, tiles, failure);
    }
    failure.is_some()
}

fn settle(
    joined: Result<PageResult, JoinError>,
    tiles: &mut AcquisitionSummary,
    failure: &mut Option<AcquireError>,
) {
    match joined {
        Ok(Ok(summary)) => *tiles += summary,
        Ok(Err(e)) => {
            error!(error = %e, "Page acquisition failed");
            failure.get_or_insert(e);
        }
        // Aborted after an earlier failure
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
            failure.get_or_insert(AcquireError::TaskFailed(e.to_string()));
        }
    }
}

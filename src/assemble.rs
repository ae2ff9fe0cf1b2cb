//! Tile-to-image reassembly.
//!
//! The server embeds `tile_overlap` pixels of each neighbour along every
//! shared tile edge. Assembly pastes the tiles onto a `width × height` canvas
//! at offsets that cancel that border:
//!
//! - tile (0, 0) goes to the canvas origin
//! - every other tile goes to `(x * tile_size - overlap, y * tile_size - overlap)`
//!
//! The second rule also shifts first-row and first-column tiles by the
//! overlap on the axis where they have no previous neighbour, so the top row
//! and left column end up one border higher/further left than their
//! neighbours. [`OverlapPolicy::Literal`] keeps that placement;
//! [`OverlapPolicy::NeighborAware`] only shifts on axes with a neighbour.
//!
//! Only the truncated grid is assembled (see
//! [`ManuscriptPageMetadata::last_tile_x`]), so a canvas wider than
//! `last_tile_x * tile_size` keeps a blank right/bottom margin.

use std::io::Cursor;
use std::sync::Arc;

use clap::ValueEnum;
use image::{imageops, DynamicImage, RgbImage};
use tracing::{error, info, warn};

use crate::error::AssembleError;
use crate::metadata::require_snapshot;
use crate::model::{ManuscriptMetadata, ManuscriptPageMetadata, TileCoord};
use crate::store::{Layout, StateStore};

// =============================================================================
// Placement
// =============================================================================

/// How tile offsets compensate for the overlap border.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OverlapPolicy {
    /// Subtract the overlap on both axes for every tile except (0, 0)
    #[default]
    Literal,
    /// Subtract the overlap only on axes where a previous neighbour exists
    NeighborAware,
}

/// Canvas position of the top-left pixel of tile `coord`.
///
/// Offsets may be negative; the part of the tile outside the canvas is
/// clipped when pasting.
pub fn paste_offset(
    page: &ManuscriptPageMetadata,
    coord: TileCoord,
    policy: OverlapPolicy,
) -> (i64, i64) {
    if coord.is_origin() {
        return (0, 0);
    }

    let tile_size = i64::from(page.tile_size);
    let overlap = i64::from(page.tile_overlap);
    let x = i64::from(coord.x) * tile_size;
    let y = i64::from(coord.y) * tile_size;

    match policy {
        OverlapPolicy::Literal => (x - overlap, y - overlap),
        OverlapPolicy::NeighborAware => (
            if coord.x > 0 { x - overlap } else { x },
            if coord.y > 0 { y - overlap } else { y },
        ),
    }
}

// =============================================================================
// Assembler
// =============================================================================

/// Result of assembling one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyOutcome {
    /// The output was produced by this call
    Assembled,
    /// The output already existed and was left untouched
    AlreadyPresent,
}

/// Per-page results of assembling a manuscript.
#[derive(Debug, Default)]
pub struct AssemblyReport {
    pub assembled: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, AssembleError)>,
}

impl AssemblyReport {
    /// Whether every page has an assembled output.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stitches downloaded tiles into one image per page.
pub struct TileAssembler {
    store: Arc<dyn StateStore>,
    layout: Layout,
    policy: OverlapPolicy,
}

impl TileAssembler {
    pub fn new(store: Arc<dyn StateStore>, layout: Layout) -> Self {
        Self {
            store,
            layout,
            policy: OverlapPolicy::default(),
        }
    }

    /// Use a different overlap compensation.
    pub fn with_policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Assemble `page` from its tiles, unless its output already exists.
    ///
    /// # Errors
    ///
    /// Fails without writing anything when a tile of the grid is missing or
    /// undecodable, or when the page format cannot be encoded.
    pub async fn assemble_page(
        &self,
        page: &ManuscriptPageMetadata,
    ) -> Result<AssemblyOutcome, AssembleError> {
        let output = self.layout.assembled_path(page);

        if self.store.exists(&output).await {
            warn!(path = %output.display(), "Assembled result already present, skipping");
            return Ok(AssemblyOutcome::AlreadyPresent);
        }

        let format = page
            .image_format()
            .ok_or_else(|| AssembleError::UnsupportedFormat(page.format.clone()))?;

        let mut canvas = RgbImage::new(page.width, page.height);

        for coord in page.tiles() {
            let path = self.layout.tile_path(page, coord);

            let data = match self.store.read(&path).await {
                Ok(data) => data,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(AssembleError::MissingTile(path));
                }
                Err(source) => return Err(AssembleError::Io { path, source }),
            };

            let tile = image::load_from_memory(&data)
                .map_err(|e| AssembleError::Image {
                    path,
                    message: e.to_string(),
                })?
                .to_rgb8();

            let (x, y) = paste_offset(page, coord, self.policy);
            imageops::replace(&mut canvas, &tile, x, y);
        }

        let mut encoded = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut encoded), format)
            .map_err(|e| AssembleError::Image {
                path: output.clone(),
                message: e.to_string(),
            })?;

        self.store
            .write(&output, &encoded)
            .await
            .map_err(|source| AssembleError::Io {
                path: output.clone(),
                source,
            })?;

        info!(page_id = %page.id, path = %output.display(), "Assembled page");
        Ok(AssemblyOutcome::Assembled)
    }

    /// Assemble every page of the manuscript started from `manuscript_page_id`.
    ///
    /// Reads only persisted snapshots. A page that fails is logged and
    /// reported; the remaining pages are still assembled.
    pub async fn assemble_manuscript(
        &self,
        manuscript_page_id: &str,
    ) -> Result<AssemblyReport, AssembleError> {
        let manuscript: ManuscriptMetadata = require_snapshot(
            self.store.as_ref(),
            &self.layout.manuscript_metadata_path(manuscript_page_id),
        )
        .await?;

        let mut report = AssemblyReport::default();

        for page_id in &manuscript.page_id_list {
            let result = match require_snapshot::<ManuscriptPageMetadata>(
                self.store.as_ref(),
                &self.layout.page_metadata_path(page_id),
            )
            .await
            {
                Ok(page) => self.assemble_page(&page).await,
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(AssemblyOutcome::Assembled) => report.assembled.push(page_id.clone()),
                Ok(AssemblyOutcome::AlreadyPresent) => report.skipped.push(page_id.clone()),
                Err(e) => {
                    error!(page_id = %page_id, error = %e, "Failed assembling a page");
                    report.failed.push((page_id.clone(), e));
                }
            }
        }

        Ok(report)
    }
}

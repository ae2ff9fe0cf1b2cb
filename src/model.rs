//! Manuscript and page metadata.
//!
//! Both types are persisted as JSON snapshots and are treated as ground truth
//! once written: a restarted run loads them verbatim and never re-derives them.

use std::collections::BTreeSet;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

// =============================================================================
// Manuscript Metadata
// =============================================================================

/// Metadata shared by every page of one manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptMetadata {
    /// Page identifiers in canonical page order (never re-sorted)
    pub page_id_list: Vec<String>,

    /// Zoom levels confirmed usable, probed once on the first page
    pub magnification_indices: BTreeSet<u32>,
}

impl ManuscriptMetadata {
    /// Create manuscript metadata from a page list and the probed indices.
    pub fn new(page_id_list: Vec<String>, magnification_indices: impl IntoIterator<Item = u32>) -> Self {
        Self {
            page_id_list,
            magnification_indices: magnification_indices.into_iter().collect(),
        }
    }

    /// Highest confirmed zoom level, the one tiles are downloaded at.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::NoMagnificationIndices`] when probing found no
    /// usable level. The manuscript cannot be downloaded in that case.
    pub fn max_magnification_index(&self) -> Result<u32, MetadataError> {
        self.magnification_indices
            .last()
            .copied()
            .ok_or(MetadataError::NoMagnificationIndices)
    }
}

// =============================================================================
// Page Metadata
// =============================================================================

/// Geometry of one manuscript page as advertised by the image server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptPageMetadata {
    /// Page identifier, also the name of the page's directory on disk
    pub id: String,

    /// Full-resolution width in pixels
    pub width: u32,

    /// Full-resolution height in pixels
    pub height: u32,

    /// Edge length of a non-edge tile in pixels
    pub tile_size: u32,

    /// Image encoding of the tiles and of the assembled output (e.g. "jpg")
    pub format: String,

    /// Pixels of overlap the server embeds along each shared tile edge
    pub tile_overlap: u32,
}

impl ManuscriptPageMetadata {
    /// Number of tile columns fetched and assembled.
    ///
    /// This is `width / tile_size` with truncating division: a partial
    /// trailing column is not part of the grid, so the right edge of a page
    /// whose width is not a multiple of `tile_size` is dropped.
    pub fn last_tile_x(&self) -> u32 {
        self.width.checked_div(self.tile_size).unwrap_or(0)
    }

    /// Number of tile rows fetched and assembled (truncating, like
    /// [`last_tile_x`](Self::last_tile_x)).
    pub fn last_tile_y(&self) -> u32 {
        self.height.checked_div(self.tile_size).unwrap_or(0)
    }

    /// Every cell of the grid, column by column.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> {
        let rows = self.last_tile_y();
        (0..self.last_tile_x()).flat_map(move |x| (0..rows).map(move |y| TileCoord::new(x, y)))
    }

    /// Total number of cells in the grid.
    pub fn tile_count(&self) -> usize {
        self.last_tile_x() as usize * self.last_tile_y() as usize
    }

    /// File name of one tile inside the page directory, e.g. `3-5.jpg`.
    pub fn tile_file_name(&self, coord: TileCoord) -> String {
        format!("{}-{}.{}", coord.x, coord.y, self.format)
    }

    /// Image codec matching the declared format, if one is available.
    pub fn image_format(&self) -> Option<ImageFormat> {
        ImageFormat::from_extension(&self.format)
    }
}

// =============================================================================
// Tile Coordinates
// =============================================================================

/// Column/row position of a tile in a page grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Whether this is the top-left corner tile.
    pub fn is_origin(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

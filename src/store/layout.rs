use std::path::{Path, PathBuf};

use crate::model::{ManuscriptPageMetadata, TileCoord};

/// Default root directory for downloaded manuscripts.
pub const DEFAULT_OUTPUT_DIR: &str = "downloaded_manuscript";

/// File name of the manuscript snapshot, stored in the starting page's directory.
pub const MANUSCRIPT_METADATA_FILENAME: &str = ".manuscript_metadata";

/// File name of the page snapshot, stored in each page directory.
pub const PAGE_METADATA_FILENAME: &str = ".metadata";

/// Prefix of assembled page images, stored in the root directory.
pub const ASSEMBLED_PREFIX: &str = "assembled-";

/// Deterministic mapping from pipeline entities to storage keys.
///
/// ```text
/// <root>/<page_id>/.manuscript_metadata   (starting page only)
/// <root>/<page_id>/.metadata
/// <root>/<page_id>/<x>-<y>.<format>
/// <root>/assembled-<page_id>.<format>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a page's tiles and snapshot.
    pub fn page_dir(&self, page_id: &str) -> PathBuf {
        self.root.join(page_id)
    }

    /// Manuscript snapshot, keyed by the page id the run was started from.
    pub fn manuscript_metadata_path(&self, manuscript_page_id: &str) -> PathBuf {
        self.page_dir(manuscript_page_id)
            .join(MANUSCRIPT_METADATA_FILENAME)
    }

    pub fn page_metadata_path(&self, page_id: &str) -> PathBuf {
        self.page_dir(page_id).join(PAGE_METADATA_FILENAME)
    }

    pub fn tile_path(&self, page: &ManuscriptPageMetadata, coord: TileCoord) -> PathBuf {
        self.page_dir(&page.id).join(page.tile_file_name(coord))
    }

    pub fn assembled_path(&self, page: &ManuscriptPageMetadata) -> PathBuf {
        self.root
            .join(format!("{}{}.{}", ASSEMBLED_PREFIX, page.id, page.format))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

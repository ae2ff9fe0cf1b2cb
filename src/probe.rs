//! Magnification level discovery.
//!
//! The image server does not advertise which zoom levels it hosts for a page.
//! [`MagnificationProber`] finds out by requesting the corner tile (0, 0) at
//! every candidate level concurrently and keeping the levels that answered
//! with a decodable image.
//!
//! Probing never fails: a timeout, a refused connection, an error status, an
//! empty body or a body that is not an image all mark that one candidate as
//! not hosted, and the other candidates are unaffected.

use std::collections::BTreeSet;
use std::io::Cursor;
use std::ops::RangeInclusive;
use std::sync::Arc;

use futures::future::join_all;
use image::ImageReader;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::transport::TileTransport;

/// Lowest zoom level probed by default.
pub const DEFAULT_MIN_MAGNIFICATION: u32 = 12;

/// Highest zoom level probed by default.
pub const DEFAULT_MAX_MAGNIFICATION: u32 = 19;

/// Determines which zoom levels the server hosts for a page.
pub struct MagnificationProber<T: TileTransport> {
    transport: Arc<T>,
    candidates: RangeInclusive<u32>,
}

impl<T: TileTransport> MagnificationProber<T> {
    /// Create a prober over the default candidate range (12 through 19).
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_candidates(
            transport,
            DEFAULT_MIN_MAGNIFICATION..=DEFAULT_MAX_MAGNIFICATION,
        )
    }

    /// Create a prober over a custom candidate range.
    pub fn with_candidates(transport: Arc<T>, candidates: RangeInclusive<u32>) -> Self {
        Self {
            transport,
            candidates,
        }
    }

    pub fn candidates(&self) -> &RangeInclusive<u32> {
        &self.candidates
    }

    /// Zoom levels for which page `page_id` has real tile data.
    ///
    /// Issues one request per candidate, all in flight at once, and writes
    /// nothing to disk. An empty set means the page cannot be downloaded.
    pub async fn probe(&self, page_id: &str) -> BTreeSet<u32> {
        let checks = self.candidates.clone().rev().map(|index| {
            let span = info_span!("probe", page_id, magnification_index = index);
            async move { (index, self.is_hosted(page_id, index).await) }.instrument(span)
        });

        let indices: BTreeSet<u32> = join_all(checks)
            .await
            .into_iter()
            .filter_map(|(index, hosted)| hosted.then_some(index))
            .collect();

        debug!(page_id, ?indices, "Magnification probing finished");
        indices
    }

    async fn is_hosted(&self, page_id: &str, index: u32) -> bool {
        let body = match self.transport.fetch_tile(page_id, index, 0, 0).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Probe request failed, skipping");
                return false;
            }
        };

        if body.is_empty() {
            warn!("Probe returned an empty body, skipping");
            return false;
        }

        match image_width(&body) {
            Some(width) if width > 0 => {
                info!("Found correct magnification index");
                true
            }
            Some(_) => {
                warn!("Probe returned a zero-width image, skipping");
                false
            }
            None => {
                warn!("Fetched data is not an image, skipping");
                false
            }
        }
    }
}

/// Width of an encoded image, read from its header.
///
/// Returns `None` when the bytes are not a recognizable image.
pub fn image_width(data: &[u8]) -> Option<u32> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
        .map(|(width, _)| width)
}

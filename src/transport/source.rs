use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::model::ManuscriptPageMetadata;

/// Collaborator that fetches listings, page descriptors and tiles.
///
/// Implementations are shared by every concurrent task of a run and must be
/// thread-safe. Retrying is their concern: a returned error is final.
#[async_trait]
pub trait TileTransport: Send + Sync {
    /// All page identifiers of the manuscript `page_id` belongs to, in
    /// canonical order.
    async fn fetch_page_list(&self, page_id: &str) -> Result<Vec<String>, TransportError>;

    /// Size, tile size, overlap and format of one page.
    async fn fetch_page_info(&self, page_id: &str)
        -> Result<ManuscriptPageMetadata, TransportError>;

    /// Raw bytes of tile (`x`, `y`) at zoom level `zoom`.
    ///
    /// An empty body is returned as-is; callers decide what it means.
    async fn fetch_tile(&self, page_id: &str, zoom: u32, x: u32, y: u32)
        -> Result<Bytes, TransportError>;
}

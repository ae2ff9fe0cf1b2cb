//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::TransportError;
use crate::model::ManuscriptPageMetadata;
use crate::transport::TileTransport;

/// Encode a solid-colour RGB image as JPEG.
pub fn encode_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(width, height, color, ImageFormat::Jpeg)
}

/// Encode a solid-colour RGB image as PNG.
pub fn encode_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(width, height, color, ImageFormat::Png)
}

fn encode(width: u32, height: u32, color: [u8; 3], format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

pub fn page(id: &str, width: u32, height: u32, tile_size: u32, format: &str) -> ManuscriptPageMetadata {
    ManuscriptPageMetadata {
        id: id.to_string(),
        width,
        height,
        tile_size,
        format: format.to_string(),
        tile_overlap: 1,
    }
}

/// Canned answer to a tile request.
#[derive(Debug, Clone)]
pub enum TileReply {
    /// A small valid JPEG
    Image,
    /// A 2xx response with no body
    Empty,
    /// Arbitrary body bytes
    Body(Vec<u8>),
    /// A transport failure
    Fail(TransportError),
}

/// Transport returning canned data and counting requests.
///
/// Tile lookups try the per-tile reply first, then the per-zoom reply, and
/// answer 404 otherwise.
#[derive(Default)]
pub struct StubTransport {
    page_list: Vec<String>,
    pages: HashMap<String, ManuscriptPageMetadata>,
    zoom_replies: HashMap<u32, TileReply>,
    tile_replies: HashMap<(String, u32, u32), TileReply>,
    list_requests: AtomicUsize,
    info_requests: AtomicUsize,
    tile_requests: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_list(mut self, pages: &[&str]) -> Self {
        self.page_list = pages.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_page(mut self, page: ManuscriptPageMetadata) -> Self {
        self.pages.insert(page.id.clone(), page);
        self
    }

    pub fn with_probe(mut self, zoom: u32, reply: TileReply) -> Self {
        self.zoom_replies.insert(zoom, reply);
        self
    }

    pub fn with_tile(mut self, page_id: &str, x: u32, y: u32, reply: TileReply) -> Self {
        self.tile_replies.insert((page_id.to_string(), x, y), reply);
        self
    }

    pub fn list_requests(&self) -> usize {
        self.list_requests.load(Ordering::SeqCst)
    }

    pub fn info_requests(&self) -> usize {
        self.info_requests.load(Ordering::SeqCst)
    }

    pub fn tile_requests(&self) -> usize {
        self.tile_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileTransport for StubTransport {
    async fn fetch_page_list(&self, _page_id: &str) -> Result<Vec<String>, TransportError> {
        self.list_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.page_list.clone())
    }

    async fn fetch_page_info(
        &self,
        page_id: &str,
    ) -> Result<ManuscriptPageMetadata, TransportError> {
        self.info_requests.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                status: 404,
                url: format!("stub://{}.xml", page_id),
            })
    }

    async fn fetch_tile(
        &self,
        page_id: &str,
        zoom: u32,
        x: u32,
        y: u32,
    ) -> Result<Bytes, TransportError> {
        self.tile_requests.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .tile_replies
            .get(&(page_id.to_string(), x, y))
            .or_else(|| self.zoom_replies.get(&zoom));

        match reply {
            Some(TileReply::Image) => Ok(Bytes::from(encode_jpeg(8, 8, [120, 60, 30]))),
            Some(TileReply::Empty) => Ok(Bytes::new()),
            Some(TileReply::Body(body)) => Ok(Bytes::from(body.clone())),
            Some(TileReply::Fail(err)) => Err(err.clone()),
            None => Err(TransportError::Status {
                status: 404,
                url: format!("stub://{}/{}/{}_{}", page_id, zoom, x, y),
            }),
        }
    }
}

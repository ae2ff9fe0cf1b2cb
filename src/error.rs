use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the remote image server transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body could not be interpreted
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// A URL could not be built or parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout(_) | TransportError::Connection(_) => true,
            TransportError::Status { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            TransportError::InvalidResponse { .. } | TransportError::InvalidUrl(_) => false,
        }
    }
}

/// Errors loading, fetching or persisting manuscript and page metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Fetching metadata from the server failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Reading or writing a snapshot failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted snapshot exists but cannot be parsed
    #[error("Corrupt metadata snapshot {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// No snapshot exists where one is required
    #[error("Metadata snapshot not found: {0}")]
    NotFound(PathBuf),

    /// Probing confirmed no usable magnification index
    #[error("No usable magnification index was found")]
    NoMagnificationIndices,

    /// The page-metadata limiter was closed
    #[error("Page metadata pool is closed")]
    PoolClosed,
}

/// Errors raised while downloading the tiles of a manuscript.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Metadata required for acquisition is unavailable
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A tile download failed after probing succeeded
    #[error("Tile ({x}, {y}) of page {page_id} at zoom {zoom} failed: {source}")]
    Tile {
        page_id: String,
        zoom: u32,
        x: u32,
        y: u32,
        #[source]
        source: TransportError,
    },

    /// Writing a tile or creating a directory failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The download limiter was closed
    #[error("Tile download pool is closed")]
    PoolClosed,

    /// A page task panicked
    #[error("Page task failed: {0}")]
    TaskFailed(String),
}

/// Errors raised while stitching a page's tiles into one image.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// Metadata required for assembly is unavailable
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A tile of the grid is absent from disk
    #[error("Missing tile: {0}")]
    MissingTile(PathBuf),

    /// A tile could not be decoded or the canvas could not be encoded
    #[error("Image error on {path}: {message}")]
    Image { path: PathBuf, message: String },

    /// The page declares a format the image codecs cannot write
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Reading a tile or writing the output failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

//! # Manuscript Fetch
//!
//! Downloads every page of a digitised manuscript from a Deep Zoom tile
//! server and reassembles each page into a single full-resolution image.
//!
//! ## Features
//!
//! - **Magnification probing**: Finds the zoom levels the server actually hosts
//! - **Restartable**: Metadata snapshots and skip-if-present tiles make reruns resume
//! - **Bounded concurrency**: Separate pools for page metadata and tile downloads
//! - **Polite**: Random jitter before each tile request, retries with backoff
//!
//! ## Architecture
//!
//! - [`transport`] - Remote server access ([`TileTransport`], [`HttpTransport`])
//! - [`probe`] - Magnification level discovery
//! - [`metadata`] - Load-or-fetch snapshots of manuscript and page metadata
//! - [`acquire`] - Tile downloads for one page
//! - [`orchestrator`] - Manuscript-level fail-fast acquisition
//! - [`assemble`] - Tile stitching
//! - [`store`] - Storage seam and on-disk layout
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use manuscript_fetch::{
//!     AcquisitionOrchestrator, FetchConfig, FsStore, HttpTransport, HttpTransportConfig,
//!     Layout, TileAssembler,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FetchConfig::default();
//!     let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
//!     let store = Arc::new(FsStore::new());
//!
//!     let orchestrator = AcquisitionOrchestrator::new(transport, store.clone(), &config);
//!     orchestrator.run("royal_ms_2_a_xvi_fs001r").await?;
//!
//!     let assembler = TileAssembler::new(store, Layout::new(&config.output_dir));
//!     assembler.assemble_manuscript("royal_ms_2_a_xvi_fs001r").await?;
//!     Ok(())
//! }
//! ```

pub mod acquire;
pub mod assemble;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod orchestrator;
pub mod probe;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use acquire::{AcquisitionSummary, TileAcquirer, TileOutcome};
pub use assemble::{paste_offset, AssemblyOutcome, AssemblyReport, OverlapPolicy, TileAssembler};
pub use config::{Cli, Command, Config, FetchConfig};
pub use error::{AcquireError, AssembleError, MetadataError, TransportError};
pub use metadata::{MetadataCache, MetadataOrigin};
pub use model::{ManuscriptMetadata, ManuscriptPageMetadata, TileCoord};
pub use orchestrator::{AcquisitionOrchestrator, RunSummary};
pub use probe::{MagnificationProber, DEFAULT_MAX_MAGNIFICATION, DEFAULT_MIN_MAGNIFICATION};
pub use store::{FsStore, Layout, MemoryStore, StateStore};
pub use transport::{HttpTransport, HttpTransportConfig, RetryPolicy, TileTransport};

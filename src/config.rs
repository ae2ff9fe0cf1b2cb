//! Configuration management for manuscript-fetch.
//!
//! This module provides:
//! - Command-line arguments via clap, with `fetch` and `assemble` subcommands
//! - Environment variables with `MSF_` prefix
//! - [`FetchConfig`], the tunables consumed by the acquisition and assembly core
//!
//! # Environment Variables
//!
//! - `MSF_OUTPUT_DIR` - Root directory for tiles and snapshots (default: downloaded_manuscript)
//! - `MSF_BASE_URL` - Manuscript viewer base URL
//! - `MSF_MIN_MAGNIFICATION` / `MSF_MAX_MAGNIFICATION` - Probed zoom range (default: 12-19)
//! - `MSF_METADATA_CONCURRENCY` - Concurrent page metadata fetches (default: 8)
//! - `MSF_DOWNLOAD_CONCURRENCY` - Concurrent tile downloads (default: 30)
//! - `MSF_MAX_JITTER_MS` - Upper bound of the per-tile delay (default: 10000)
//! - `MSF_REQUEST_TIMEOUT` - Per-request timeout in seconds (default: 30)
//! - `MSF_RETRY_BACKOFF_MS` - Base retry backoff (default: 200)
//! - `MSF_USER_AGENT` - User-Agent header
//! - `MSF_OVERLAP_POLICY` - `literal` or `neighbor-aware` (default: literal)

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::assemble::OverlapPolicy;
use crate::error::TransportError;
use crate::probe::{DEFAULT_MAX_MAGNIFICATION, DEFAULT_MIN_MAGNIFICATION};
use crate::store::DEFAULT_OUTPUT_DIR;
use crate::transport::{page_id_from_viewer_url, HttpTransportConfig, DEFAULT_BASE_URL};

// =============================================================================
// Default Values
// =============================================================================

/// Default ceiling on concurrent page metadata fetches.
pub const DEFAULT_METADATA_CONCURRENCY: usize = 8;

/// Default ceiling on concurrent tile downloads, shared by all pages.
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 30;

/// Default upper bound of the random delay before each tile request.
pub const DEFAULT_MAX_JITTER_MS: u64 = 10_000;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default base retry backoff in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

// =============================================================================
// Core Configuration
// =============================================================================

/// Tunables of the acquisition and assembly pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Root directory for snapshots, tiles and assembled pages
    pub output_dir: PathBuf,

    /// Zoom levels probed on the first page
    pub magnification_candidates: RangeInclusive<u32>,

    /// Size of the page metadata fetch pool
    pub metadata_concurrency: usize,

    /// Size of the tile download pool
    pub download_concurrency: usize,

    /// Upper bound of the uniformly random delay taken before each tile request
    pub max_jitter: Duration,

    /// How tile offsets compensate for overlap during assembly
    pub overlap_policy: OverlapPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            magnification_candidates: DEFAULT_MIN_MAGNIFICATION..=DEFAULT_MAX_MAGNIFICATION,
            metadata_concurrency: DEFAULT_METADATA_CONCURRENCY,
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            max_jitter: Duration::from_millis(DEFAULT_MAX_JITTER_MS),
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// manuscript-fetch - Downloads tiled manuscript pages and reassembles them.
#[derive(Parser, Debug, Clone)]
#[command(name = "manuscript-fetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Probe, then download every tile of every page of a manuscript.
    Fetch(Config),

    /// Stitch downloaded tiles into one image per page.
    Assemble(Config),
}

/// Options shared by both subcommands.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Viewer URL of any page of the manuscript (its `ref` parameter names the page).
    pub url: String,

    /// Root directory for snapshots, tiles and assembled pages.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR, env = "MSF_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Base URL of the manuscript viewer and tile proxy.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "MSF_BASE_URL")]
    pub base_url: String,

    /// User-Agent header sent with every request.
    #[arg(long, env = "MSF_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "MSF_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Base delay of the exponential retry backoff, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_RETRY_BACKOFF_MS, env = "MSF_RETRY_BACKOFF_MS")]
    pub retry_backoff_ms: u64,

    // =========================================================================
    // Probing Configuration
    // =========================================================================
    /// Lowest zoom level probed.
    #[arg(long, default_value_t = DEFAULT_MIN_MAGNIFICATION, env = "MSF_MIN_MAGNIFICATION")]
    pub min_magnification: u32,

    /// Highest zoom level probed.
    #[arg(long, default_value_t = DEFAULT_MAX_MAGNIFICATION, env = "MSF_MAX_MAGNIFICATION")]
    pub max_magnification: u32,

    // =========================================================================
    // Concurrency Configuration
    // =========================================================================
    /// Maximum concurrent page metadata fetches.
    #[arg(long, default_value_t = DEFAULT_METADATA_CONCURRENCY, env = "MSF_METADATA_CONCURRENCY")]
    pub metadata_concurrency: usize,

    /// Maximum concurrent tile downloads across all pages.
    #[arg(long, default_value_t = DEFAULT_DOWNLOAD_CONCURRENCY, env = "MSF_DOWNLOAD_CONCURRENCY")]
    pub download_concurrency: usize,

    /// Upper bound of the random delay before each tile request, in milliseconds.
    ///
    /// The delay is taken while holding a download slot, so it also throttles
    /// overall throughput.
    #[arg(long, default_value_t = DEFAULT_MAX_JITTER_MS, env = "MSF_MAX_JITTER_MS")]
    pub max_jitter_ms: u64,

    // =========================================================================
    // Assembly Configuration
    // =========================================================================
    /// How tile offsets compensate for the overlap border.
    #[arg(long, value_enum, default_value_t = OverlapPolicy::Literal, env = "MSF_OVERLAP_POLICY")]
    pub overlap_policy: OverlapPolicy,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_magnification > self.max_magnification {
            return Err(format!(
                "min_magnification ({}) must not exceed max_magnification ({})",
                self.min_magnification, self.max_magnification
            ));
        }

        if self.metadata_concurrency == 0 {
            return Err("metadata_concurrency must be greater than 0".to_string());
        }
        if self.download_concurrency == 0 {
            return Err("download_concurrency must be greater than 0".to_string());
        }

        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }

        if self.base_url.is_empty() {
            return Err("base_url is required. Set --base-url or MSF_BASE_URL".to_string());
        }

        self.page_id().map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Page id named by the viewer URL.
    pub fn page_id(&self) -> Result<String, TransportError> {
        page_id_from_viewer_url(&self.url)
    }

    /// Core pipeline settings.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            output_dir: self.output_dir.clone(),
            magnification_candidates: self.min_magnification..=self.max_magnification,
            metadata_concurrency: self.metadata_concurrency,
            download_concurrency: self.download_concurrency,
            max_jitter: Duration::from_millis(self.max_jitter_ms),
            overlap_policy: self.overlap_policy,
        }
    }

    /// HTTP transport settings.
    pub fn transport_config(&self) -> HttpTransportConfig {
        let mut config =
            HttpTransportConfig::with_backoff(Duration::from_millis(self.retry_backoff_ms));
        config.base_url = self.base_url.clone();
        config.timeout = Duration::from_secs(self.request_timeout);
        if let Some(ref user_agent) = self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config
    }
}

// =============================================================================
// Tests
// =============================================================================

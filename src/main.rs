//! Manuscript Fetch - downloads tiled manuscript pages and reassembles them.
//!
//! This binary wires the HTTP transport and filesystem store into the
//! acquisition and assembly pipeline.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manuscript_fetch::{
    config::{Cli, Command, Config},
    AcquisitionOrchestrator, FsStore, HttpTransport, Layout, StateStore, TileAssembler,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Fetch(config) => run_fetch(config).await,
        Command::Assemble(config) => run_assemble(config).await,
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: Config) -> ExitCode {
    init_logging(config.verbose);

    let Some(page_id) = validated_page_id(&config) else {
        return ExitCode::FAILURE;
    };

    let fetch_config = config.fetch_config();

    info!("Configuration:");
    info!("  Page: {}", page_id);
    info!("  Server: {}", config.base_url);
    info!("  Output: {}", fetch_config.output_dir.display());
    info!(
        "  Magnification candidates: {}..={}",
        fetch_config.magnification_candidates.start(),
        fetch_config.magnification_candidates.end()
    );
    info!(
        "  Pools: {} metadata, {} downloads, jitter up to {}ms",
        fetch_config.metadata_concurrency, fetch_config.download_concurrency, config.max_jitter_ms
    );

    let transport = match HttpTransport::new(config.transport_config()) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store: Arc<dyn StateStore> = Arc::new(FsStore::new());

    let orchestrator = AcquisitionOrchestrator::new(transport, store, &fetch_config);

    match orchestrator.run(&page_id).await {
        Ok(summary) => {
            info!(
                "Fetched {} page(s) at magnification {}: {} downloaded, {} already present, {} empty",
                summary.pages,
                summary.magnification_index,
                summary.tiles.downloaded,
                summary.tiles.skipped,
                summary.tiles.empty
            );
            if summary.tiles.empty > 0 {
                warn!(
                    "{} tile(s) came back empty; the affected pages cannot be assembled until refetched",
                    summary.tiles.empty
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fetch failed: {}", e);
            error!("Rerun the same command to resume from what is already on disk");
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Assemble Command
// =============================================================================

async fn run_assemble(config: Config) -> ExitCode {
    init_logging(config.verbose);

    let Some(page_id) = validated_page_id(&config) else {
        return ExitCode::FAILURE;
    };

    let fetch_config = config.fetch_config();
    let store: Arc<dyn StateStore> = Arc::new(FsStore::new());
    let assembler = TileAssembler::new(store, Layout::new(&fetch_config.output_dir))
        .with_policy(fetch_config.overlap_policy);

    match assembler.assemble_manuscript(&page_id).await {
        Ok(report) => {
            info!(
                "Assembled {} page(s), {} already present, {} failed",
                report.assembled.len(),
                report.skipped.len(),
                report.failed.len()
            );
            for (page, e) in &report.failed {
                error!("  {}: {}", page, e);
            }
            if report.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("Assembly failed: {}", e);
            error!("Run `fetch` for this manuscript first");
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Validate the configuration and resolve the starting page id.
fn validated_page_id(config: &Config) -> Option<String> {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return None;
    }

    match config.page_id() {
        Ok(page_id) => Some(page_id),
        Err(e) => {
            error!("Configuration error: {}", e);
            None
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "manuscript_fetch=debug"
    } else {
        "manuscript_fetch=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

//! Fetch-then-assemble integration tests.
//!
//! Tests verify:
//! - Assembled pages have the advertised size and tile placement
//! - Assembly is idempotent and needs no network
//! - A page with a missing tile fails alone

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use manuscript_fetch::{
    AcquisitionOrchestrator, AssembleError, FetchConfig, FsStore, Layout, OverlapPolicy,
    StateStore, TileAssembler,
};
use tempfile::TempDir;

use super::test_utils::{page, tile_color, MockTransport};

fn config(dir: &Path) -> FetchConfig {
    FetchConfig {
        output_dir: dir.to_path_buf(),
        magnification_candidates: 12..=19,
        max_jitter: Duration::ZERO,
        ..Default::default()
    }
}

async fn fetch(transport: &MockTransport, dir: &Path, start: &str) {
    let store: Arc<dyn StateStore> = Arc::new(FsStore::new());
    AcquisitionOrchestrator::new(Arc::new(transport.clone()), store, &config(dir))
        .run(start)
        .await
        .unwrap();
}

fn assembler(dir: &Path) -> TileAssembler {
    TileAssembler::new(Arc::new(FsStore::new()), Layout::new(dir))
}

#[tokio::test]
async fn test_fetch_then_assemble() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::new()
        .with_page(page("p1", 512, 512, 256, "jpg"))
        .with_hosted_zooms([14]);

    fetch(&transport, dir.path(), "p1").await;
    let requests = transport.total_requests();

    let report = assembler(dir.path()).assemble_manuscript("p1").await.unwrap();

    assert_eq!(report.assembled, vec!["p1"]);
    assert!(report.is_complete());
    assert_eq!(transport.total_requests(), requests);

    let img = image::open(dir.path().join("assembled-p1.jpg")).unwrap();
    assert_eq!((img.width(), img.height()), (512, 512));
}

#[tokio::test]
async fn test_tiles_land_at_overlap_offsets() {
    let dir = TempDir::new().unwrap();
    // 3 columns by 4 rows of lossless tiles.
    let transport = MockTransport::new()
        .with_page(page("p1", 768, 1024, 256, "png"))
        .with_hosted_zooms([14]);

    fetch(&transport, dir.path(), "p1").await;
    assembler(dir.path()).assemble_manuscript("p1").await.unwrap();

    let img = image::open(dir.path().join("assembled-p1.png"))
        .unwrap()
        .to_rgb8();

    assert_eq!(img.get_pixel(0, 0).0, tile_color(0, 0));
    // Tile (2, 3) starts at (2 * 256 - 1, 3 * 256 - 1).
    assert_eq!(img.get_pixel(511, 767).0, tile_color(2, 3));
    assert_eq!(img.get_pixel(510, 766).0, tile_color(1, 2));
}

#[tokio::test]
async fn test_neighbor_aware_policy_keeps_first_row_aligned() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::new()
        .with_page(page("p1", 512, 512, 256, "png"))
        .with_hosted_zooms([14]);

    fetch(&transport, dir.path(), "p1").await;
    let report = assembler(dir.path())
        .with_policy(OverlapPolicy::NeighborAware)
        .assemble_manuscript("p1")
        .await
        .unwrap();
    assert!(report.is_complete());

    let img = image::open(dir.path().join("assembled-p1.png"))
        .unwrap()
        .to_rgb8();

    // Tile (1, 0) is pasted at (255, 0); tile (0, 1) at (0, 255).
    assert_eq!(img.get_pixel(255, 0).0, tile_color(1, 0));
    assert_eq!(img.get_pixel(254, 0).0, tile_color(0, 0));
    assert_eq!(img.get_pixel(0, 255).0, tile_color(0, 1));
}

#[tokio::test]
async fn test_assemble_twice_keeps_output() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::new()
        .with_page(page("p1", 512, 512, 256, "png"))
        .with_hosted_zooms([14]);

    fetch(&transport, dir.path(), "p1").await;
    let assembler = assembler(dir.path());

    assembler.assemble_manuscript("p1").await.unwrap();
    let first = std::fs::read(dir.path().join("assembled-p1.png")).unwrap();

    let report = assembler.assemble_manuscript("p1").await.unwrap();
    let second = std::fs::read(dir.path().join("assembled-p1.png")).unwrap();

    assert_eq!(report.skipped, vec!["p1"]);
    assert!(report.assembled.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_tile_fails_only_its_page() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::new()
        .with_page(page("p1", 512, 512, 256, "jpg"))
        .with_page(page("p2", 512, 512, 256, "jpg"))
        .with_hosted_zooms([14])
        .with_empty_tile("p1", 0, 1);

    fetch(&transport, dir.path(), "p1").await;
    let report = assembler(dir.path()).assemble_manuscript("p1").await.unwrap();

    assert_eq!(report.assembled, vec!["p2"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "p1");
    assert!(matches!(report.failed[0].1, AssembleError::MissingTile(_)));

    assert!(!dir.path().join("assembled-p1.jpg").exists());
    assert!(dir.path().join("assembled-p2.jpg").exists());
}

#[tokio::test]
async fn test_assemble_without_fetch_fails() {
    let dir = TempDir::new().unwrap();
    let result = assembler(dir.path()).assemble_manuscript("p1").await;
    assert!(matches!(result, Err(AssembleError::Metadata(_))));
}

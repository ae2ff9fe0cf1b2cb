//! HTTP transport integration tests against a local server.
//!
//! Tests verify:
//! - Page listing and descriptor parsing over the wire
//! - Retry on transient statuses, no retry on permanent ones
//! - The prober sees non-image and error responses as unhosted levels

use std::sync::Arc;
use std::time::Duration;

use image::ImageFormat;
use manuscript_fetch::{
    HttpTransport, HttpTransportConfig, MagnificationProber, RetryPolicy, TileTransport,
    TransportError,
};

use super::test_utils::{solid_image, Responder, TestServer};

const VIEWER_HTML: &str = r#"<html><body>
<form><input type="hidden" id="PageList" value="add_ms_1_f001r||##||add_ms_1_f001v||add_ms_1_f002r" /></form>
</body></html>"#;

const DESCRIPTOR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="http://schemas.microsoft.com/deepzoom/2008" TileSize="256" Overlap="1" Format="jpg">
  <Size Width="5000" Height="7000"/>
</Image>"#;

fn transport(server: &TestServer) -> HttpTransport {
    let mut config = HttpTransportConfig::with_backoff(Duration::from_millis(1));
    config.base_url = server.base_url();
    config.timeout = Duration::from_secs(5);
    HttpTransport::new(config).unwrap()
}

#[tokio::test]
async fn test_fetch_page_list() {
    let responder: Responder = Arc::new(|target: &str, _: usize| {
        if target == "/manuscripts/Viewer.aspx?ref=add_ms_1_f001r" {
            (200, VIEWER_HTML.as_bytes().to_vec())
        } else {
            (404, Vec::new())
        }
    });
    let server = TestServer::start(responder).await;

    let pages = transport(&server)
        .fetch_page_list("add_ms_1_f001r")
        .await
        .unwrap();

    assert_eq!(
        pages,
        vec!["add_ms_1_f001r", "add_ms_1_f001v", "add_ms_1_f002r"]
    );
}

#[tokio::test]
async fn test_fetch_page_info() {
    let responder: Responder = Arc::new(|target: &str, _: usize| {
        if target == "/manuscripts/Proxy.ashx?view=add_ms_1_f001r.xml" {
            (200, DESCRIPTOR.as_bytes().to_vec())
        } else {
            (404, Vec::new())
        }
    });
    let server = TestServer::start(responder).await;

    let page = transport(&server)
        .fetch_page_info("add_ms_1_f001r")
        .await
        .unwrap();

    assert_eq!(page.id, "add_ms_1_f001r");
    assert_eq!((page.width, page.height), (5000, 7000));
    assert_eq!(page.tile_size, 256);
    assert_eq!(page.tile_overlap, 1);
    assert_eq!(page.format, "jpg");
}

#[tokio::test]
async fn test_tile_retried_on_transient_status() {
    const TARGET: &str = "/manuscripts/Proxy.ashx?view=p_files/14/2_3.jpg";

    let tile = solid_image(16, 16, [10, 20, 30], ImageFormat::Jpeg);
    let body = tile.clone();
    let responder: Responder = Arc::new(move |target: &str, previous: usize| {
        if target != TARGET {
            (404, Vec::new())
        } else if previous < 2 {
            (503, Vec::new())
        } else {
            (200, body.clone())
        }
    });
    let server = TestServer::start(responder).await;

    let data = transport(&server).fetch_tile("p", 14, 2, 3).await.unwrap();

    assert_eq!(data.as_ref(), tile.as_slice());
    assert_eq!(server.hits(TARGET), 3);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    const TARGET: &str = "/manuscripts/Proxy.ashx?view=p_files/19/0_0.jpg";

    let responder: Responder = Arc::new(|_: &str, _: usize| (404, Vec::new()));
    let server = TestServer::start(responder).await;

    let result = transport(&server).fetch_tile("p", 19, 0, 0).await;

    assert!(matches!(
        result,
        Err(TransportError::Status { status: 404, .. })
    ));
    assert_eq!(server.hits(TARGET), 1);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    const TARGET: &str = "/manuscripts/Proxy.ashx?view=p_files/14/0_0.jpg";

    let responder: Responder = Arc::new(|_: &str, _: usize| (502, Vec::new()));
    let server = TestServer::start(responder).await;

    let mut config = HttpTransportConfig::with_backoff(Duration::from_millis(1));
    config.base_url = server.base_url();
    config.tile_retry = RetryPolicy::new(4, Duration::from_millis(1));
    let transport = HttpTransport::new(config).unwrap();

    let result = transport.fetch_tile("p", 14, 0, 0).await;

    assert!(matches!(
        result,
        Err(TransportError::Status { status: 502, .. })
    ));
    assert_eq!(server.hits(TARGET), 4);
}

#[tokio::test]
async fn test_probe_over_http() {
    let tile = solid_image(64, 64, [200, 100, 50], ImageFormat::Jpeg);
    let responder: Responder = Arc::new(move |target: &str, _: usize| {
        match target {
            "/manuscripts/Proxy.ashx?view=p_files/13/0_0.jpg"
            | "/manuscripts/Proxy.ashx?view=p_files/14/0_0.jpg" => (200, tile.clone()),
            // Hosted, but answers with an error page.
            "/manuscripts/Proxy.ashx?view=p_files/15/0_0.jpg" => {
                (200, b"<html>error</html>".to_vec())
            }
            // Empty body.
            "/manuscripts/Proxy.ashx?view=p_files/16/0_0.jpg" => (200, Vec::new()),
            _ => (404, Vec::new()),
        }
    });
    let server = TestServer::start(responder).await;

    let prober = MagnificationProber::with_candidates(Arc::new(transport(&server)), 12..=16);
    let indices = prober.probe("p").await;

    assert_eq!(indices.into_iter().collect::<Vec<_>>(), vec![13, 14]);
}

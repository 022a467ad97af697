//! Integration tests for the mosaic pipeline.
//!
//! These tests drive the public API end to end against an in-process tile
//! server:
//! - boundary → tile range → fetched tiles → assembled mosaic
//! - cache reuse across runs with a persisted session
//! - dry runs and both cache layouts
//!
//! Run with: `cargo test --test pipeline_integration`

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use tilemosaic::cache::{CacheLayout, TileCache};
use tilemosaic::coord::{GeoBoundingBox, TileIndex};
use tilemosaic::mosaic::read_jpeg_comment;
use tilemosaic::orchestrator::{
    BoundaryOutcome, BoundaryStatus, MosaicOrchestrator, MosaicRequest, PipelineConfig, RunReport,
    SessionState, ATTRIBUTION, SESSION_FILE_NAME,
};
use tilemosaic::provider::{AsyncHttpClient, FetchConfig, ProviderError, ServiceConfig};

// ============================================================================
// Test Tile Server
// ============================================================================

const TEMPLATE: &str = "mock://tiles/{z}/{x}/{y}.png";

/// Serves solid-colour PNG tiles whose colour depends on the tile's x/y.
#[derive(Clone, Default)]
struct TileServer {
    requests: Arc<AtomicUsize>,
}

impl TileServer {
    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn serve(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let tile = parse_tile_url(url)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("bad url {}", url)))?;
        Ok(png(color_for(tile.x, tile.y)))
    }
}

impl AsyncHttpClient for TileServer {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.serve(url)
    }

    async fn get_with_headers(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
    ) -> Result<Vec<u8>, ProviderError> {
        self.serve(url)
    }
}

fn parse_tile_url(url: &str) -> Option<TileIndex> {
    let path = url.strip_prefix("mock://tiles/")?.strip_suffix(".png")?;
    let mut parts = path.split('/');
    let zoom = parts.next()?.parse().ok()?;
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    Some(TileIndex::new(zoom, x, y))
}

fn color_for(x: u32, y: u32) -> Rgb<u8> {
    match (x % 2, y % 2) {
        (0, 0) => Rgb([220, 20, 20]),
        (1, 0) => Rgb([20, 220, 20]),
        (0, _) => Rgb([20, 20, 220]),
        _ => Rgb([230, 230, 230]),
    }
}

fn png(color: Rgb<u8>) -> Vec<u8> {
    let img = RgbImage::from_pixel(256, 256, color);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

// ============================================================================
// Helper Functions
// ============================================================================

fn pipeline_config() -> PipelineConfig {
    PipelineConfig::new().with_parallel(3).with_fetch(
        FetchConfig::new()
            .with_max_retries(1)
            .with_retry_base_delay(Duration::from_millis(1)),
    )
}

fn service() -> ServiceConfig {
    ServiceConfig::new("Mock Tiles", TEMPLATE)
}

/// Lower Manhattan; two tiles wide at zoom 14.
fn nyc() -> GeoBoundingBox {
    GeoBoundingBox::new(-74.01, 40.70, -74.00, 40.71)
}

fn request(output: &Path, bbox: GeoBoundingBox, zoom: u8) -> MosaicRequest {
    MosaicRequest::new(vec![bbox.into()], zoom, output, service())
        .with_prefix("area")
        .with_run(true)
}

fn only_outcome(report: &RunReport) -> &BoundaryOutcome {
    assert_eq!(report.boundaries.len(), 1);
    report.boundaries[0].result.as_ref().unwrap()
}

fn assert_close(actual: &Rgb<u8>, expected: Rgb<u8>) {
    for (a, e) in actual.0.iter().zip(expected.0.iter()) {
        assert!(
            (*a as i16 - *e as i16).abs() <= 12,
            "pixel {:?} too far from {:?}",
            actual,
            expected
        );
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A second run with the persisted session must not touch the network.
#[tokio::test]
async fn test_second_run_reuses_mosaic_without_fetching() {
    let dir = TempDir::new().unwrap();
    let session_path = dir.path().join(SESSION_FILE_NAME);
    let server = TileServer::default();
    let orchestrator = MosaicOrchestrator::new(server.clone(), pipeline_config());

    let mut session = SessionState::load(&session_path).unwrap();
    let report = orchestrator
        .run(&request(dir.path(), nyc(), 14), &mut session)
        .await
        .unwrap();
    session.save(&session_path).unwrap();

    let first = only_outcome(&report);
    assert_eq!(first.status, BoundaryStatus::Built);
    assert_eq!(first.tile_count, 2);
    assert_eq!(server.requests(), 2);
    assert_eq!(report.attribution, ATTRIBUTION);

    let mut session = SessionState::load(&session_path).unwrap();
    let report = orchestrator
        .run(&request(dir.path(), nyc(), 14), &mut session)
        .await
        .unwrap();

    let second = only_outcome(&report);
    assert_eq!(second.status, BoundaryStatus::Cached);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.mosaic_path, first.mosaic_path);
    assert_eq!(server.requests(), 2);
}

/// Tiles land in the canvas by index regardless of fetch completion order.
#[tokio::test]
async fn test_two_by_two_mosaic_placement() {
    let dir = TempDir::new().unwrap();
    let server = TileServer::default();
    let orchestrator = MosaicOrchestrator::new(server.clone(), pipeline_config());
    let mut session = SessionState::new();

    let world = GeoBoundingBox::new(-180.0, -85.0, 180.0, 85.0);
    let report = orchestrator
        .run(&request(dir.path(), world, 1), &mut session)
        .await
        .unwrap();

    let outcome = only_outcome(&report);
    assert_eq!(outcome.tile_count, 4);
    assert_eq!(server.requests(), 4);

    let mosaic = image::open(&outcome.mosaic_path).unwrap().to_rgb8();
    assert_eq!(mosaic.dimensions(), (512, 512));
    assert_close(mosaic.get_pixel(128, 128), color_for(0, 0));
    assert_close(mosaic.get_pixel(384, 128), color_for(1, 0));
    assert_close(mosaic.get_pixel(128, 384), color_for(0, 1));
    assert_close(mosaic.get_pixel(384, 384), color_for(1, 1));
}

/// A dry run reports what would happen and leaves no trace.
#[tokio::test]
async fn test_dry_run_reports_counts_only() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("mosaics");
    let server = TileServer::default();
    let orchestrator = MosaicOrchestrator::new(server.clone(), pipeline_config());
    let mut session = SessionState::new();

    let req = request(&output, nyc(), 14).with_run(false);
    let report = orchestrator.run(&req, &mut session).await.unwrap();

    let outcome = only_outcome(&report);
    assert_eq!(outcome.status, BoundaryStatus::DryRun);
    assert_eq!(outcome.tile_count, 2);
    assert_eq!(outcome.missing, 2);
    assert_eq!(server.requests(), 0);
    assert!(!output.exists());
    assert_eq!(session, SessionState::new());

    let frame = outcome.frame;
    assert_eq!(frame[0], frame[4]);
    assert!(frame[0].lon <= -74.01 && frame[1].lon >= -74.00);
}

/// Changing the zoom changes the fingerprint and forces a rebuild.
#[tokio::test]
async fn test_zoom_change_rebuilds() {
    let dir = TempDir::new().unwrap();
    let server = TileServer::default();
    let orchestrator = MosaicOrchestrator::new(server.clone(), pipeline_config());
    let mut session = SessionState::new();

    orchestrator
        .run(&request(dir.path(), nyc(), 14), &mut session)
        .await
        .unwrap();
    let before = session.last_fingerprint.clone();

    let report = orchestrator
        .run(&request(dir.path(), nyc(), 15), &mut session)
        .await
        .unwrap();

    let outcome = only_outcome(&report);
    assert_eq!(outcome.status, BoundaryStatus::Built);
    assert!(outcome.fetched > 0);
    assert_ne!(session.last_fingerprint, before);

    let data = std::fs::read(&outcome.mosaic_path).unwrap();
    let comment = read_jpeg_comment(&data).unwrap();
    assert!(comment.ends_with(&session.last_fingerprint));
}

/// The legacy layout keeps `.png` mosaic names but writes JPEG bytes.
#[tokio::test]
async fn test_legacy_layout_names() {
    let dir = TempDir::new().unwrap();
    let server = TileServer::default();
    let orchestrator = MosaicOrchestrator::new(
        server.clone(),
        pipeline_config().with_layout(CacheLayout::Legacy),
    );
    let mut session = SessionState::new();

    let report = orchestrator
        .run(&request(dir.path(), nyc(), 14), &mut session)
        .await
        .unwrap();

    let outcome = only_outcome(&report);
    assert_eq!(outcome.mosaic_path, dir.path().join("area_0.png"));

    let data = std::fs::read(&outcome.mosaic_path).unwrap();
    assert_eq!(&data[..2], &[0xFF, 0xD8]);
    assert_eq!(
        read_jpeg_comment(&data).as_deref(),
        Some("MockTiles144823616048246160")
    );

    let cache = TileCache::new(dir.path(), CacheLayout::Legacy);
    let tile = cache.tile_path("Mock Tiles", TileIndex::new(14, 4823, 6160));
    assert!(tile.ends_with("MockTiles1448236160.png"));
    assert!(tile.exists());

    // Same layout, same session: reused
    let report = orchestrator
        .run(&request(dir.path(), nyc(), 14), &mut session)
        .await
        .unwrap();
    assert_eq!(only_outcome(&report).status, BoundaryStatus::Cached);
    assert_eq!(server.requests(), 2);
}

/// Boundaries in one request each get their own mosaic and fingerprint.
#[tokio::test]
async fn test_multiple_boundaries() {
    let dir = TempDir::new().unwrap();
    let server = TileServer::default();
    let orchestrator = MosaicOrchestrator::new(server.clone(), pipeline_config());
    let mut session = SessionState::new();

    let boston = GeoBoundingBox::new(-71.06, 42.35, -71.05, 42.36);
    let mut req = request(dir.path(), nyc(), 14);
    req.boundaries.push(boston.into());

    let report = orchestrator.run(&req, &mut session).await.unwrap();
    assert!(report.all_succeeded());
    let paths: Vec<_> = report.outcomes().map(|o| o.mosaic_path.clone()).collect();
    assert_eq!(paths, vec![dir.path().join("area_0.jpg"), dir.path().join("area_1.jpg")]);
    assert!(session.fingerprint_for(0).is_some());
    assert!(session.fingerprint_for(1).is_some());

    let fetched = server.requests();
    let report = orchestrator.run(&req, &mut session).await.unwrap();
    assert!(report.outcomes().all(|o| o.status == BoundaryStatus::Cached));
    assert_eq!(server.requests(), fetched);
}

//! TileMosaic - slippy-map tile mosaics for arbitrary boundaries
//!
//! Fetches raster tiles from an XYZ tile service, stitches the tiles that
//! cover a geographic boundary into one JPEG mosaic and caches both tiles
//! and mosaics on disk so repeated runs avoid the network.
//!
//! # Example
//!
//! ```no_run
//! use tilemosaic::coord::GeoBoundingBox;
//! use tilemosaic::orchestrator::{MosaicOrchestrator, MosaicRequest, PipelineConfig, SessionState};
//! use tilemosaic::provider::{AsyncReqwestClient, ServiceCatalog};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = ServiceCatalog::builtin()?;
//! let mut session = SessionState::new();
//! let service = session.select_service(&catalog, "OpenStreetMap")?;
//!
//! let boundary = GeoBoundingBox::new(-74.01, 40.70, -74.00, 40.71).into();
//! let request = MosaicRequest::new(vec![boundary], 14, "/tmp/mosaics", service).with_run(true);
//!
//! let orchestrator = MosaicOrchestrator::new(AsyncReqwestClient::new()?, PipelineConfig::new());
//! let report = orchestrator.run(&request, &mut session).await?;
//! for outcome in report.outcomes() {
//!     println!("{} ({})", outcome.mosaic_path.display(), outcome.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod mosaic;
pub mod orchestrator;
pub mod provider;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

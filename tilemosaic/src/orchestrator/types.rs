//! Request, configuration and report types for the mosaic pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::MosaicError;
use crate::cache::CacheLayout;
use crate::coord::{Boundary, GeoPoint, TileRange};
use crate::provider::{FetchConfig, ServiceConfig};

/// Attribution reported with every run.
pub const ATTRIBUTION: &str = "copyright Slippy";

/// Default number of concurrent tile fetches.
pub const DEFAULT_PARALLEL: usize = 6;

/// Upper bound on concurrent tile fetches.
pub const MAX_PARALLEL: usize = 32;

/// Default JPEG quality for mosaics.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default limit on tiles per boundary.
pub const DEFAULT_MAX_TILES: usize = 1024;

/// Default mosaic file name prefix.
pub const DEFAULT_PREFIX: &str = "slippy";

/// What to do when tiles still fail after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the boundary; no mosaic is written.
    #[default]
    Abort,
    /// Paint failed tiles with a placeholder and write a partial mosaic.
    Placeholder,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Abort => "abort",
            FailurePolicy::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "placeholder" => Ok(FailurePolicy::Placeholder),
            other => Err(format!(
                "unknown failure policy '{}' (expected abort or placeholder)",
                other
            )),
        }
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    /// Concurrent fetches per boundary, 1..=32
    pub parallel: usize,
    pub jpeg_quality: u8,
    pub failure_policy: FailurePolicy,
    pub layout: CacheLayout,
    /// Boundaries whose range exceeds this many tiles are rejected
    pub max_tiles: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            parallel: DEFAULT_PARALLEL,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            failure_policy: FailurePolicy::default(),
            layout: CacheLayout::default(),
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.clamp(1, MAX_PARALLEL);
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_layout(mut self, layout: CacheLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.max_tiles = max_tiles.max(1);
        self
    }
}

/// Everything the caller supplies for one run.
#[derive(Debug, Clone)]
pub struct MosaicRequest {
    pub boundaries: Vec<Boundary>,
    pub zoom: u8,
    /// Receives the mosaics and the tile cache directory
    pub output_dir: PathBuf,
    /// Mosaic `i` is named `{prefix}_{i}.<ext>`
    pub prefix: String,
    pub service: ServiceConfig,
    /// When false, nothing is fetched or written
    pub run: bool,
}

impl MosaicRequest {
    pub fn new(
        boundaries: Vec<Boundary>,
        zoom: u8,
        output_dir: impl Into<PathBuf>,
        service: ServiceConfig,
    ) -> Self {
        Self {
            boundaries,
            zoom,
            output_dir: output_dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            service,
            run: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_run(mut self, run: bool) -> Self {
        self.run = run;
        self
    }
}

/// How a boundary's mosaic came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryStatus {
    /// Existing mosaic was valid and reused
    Cached,
    /// Mosaic was (re)built from complete tiles
    Built,
    /// Mosaic was written with `failed` placeholder tiles
    Partial { failed: usize },
    /// Nothing was fetched or written
    DryRun,
}

impl fmt::Display for BoundaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryStatus::Cached => write!(f, "cached"),
            BoundaryStatus::Built => write!(f, "built"),
            BoundaryStatus::Partial { failed } => write!(f, "partial ({} failed)", failed),
            BoundaryStatus::DryRun => write!(f, "dry run"),
        }
    }
}

/// Result of one successfully handled boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryOutcome {
    /// Where the mosaic is, or would be written
    pub mosaic_path: PathBuf,
    /// Closed ring SW, SE, NE, NW, SW
    pub frame: [GeoPoint; 5],
    pub range: TileRange,
    /// Tiles in the range
    pub tile_count: usize,
    /// Tiles absent from the cache before this run
    pub missing: usize,
    /// Tiles fetched over the network during this run
    pub fetched: usize,
    pub status: BoundaryStatus,
}

impl BoundaryOutcome {
    pub fn mosaic_path(&self) -> &Path {
        &self.mosaic_path
    }
}

/// Per-boundary entry of a [`RunReport`].
#[derive(Debug)]
pub struct BoundaryReport {
    /// Position of the boundary in the request
    pub index: usize,
    pub result: Result<BoundaryOutcome, MosaicError>,
}

/// Result of a whole run.
#[derive(Debug)]
pub struct RunReport {
    pub boundaries: Vec<BoundaryReport>,
    pub attribution: &'static str,
}

impl RunReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &BoundaryOutcome> {
        self.boundaries.iter().filter_map(|b| b.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &MosaicError)> {
        self.boundaries
            .iter()
            .filter_map(|b| b.result.as_ref().err().map(|e| (b.index, e)))
    }

    /// Tiles fetched across all boundaries.
    pub fn total_fetched(&self) -> usize {
        self.outcomes().map(|o| o.fetched).sum()
    }

    pub fn all_succeeded(&self) -> bool {
        self.boundaries.iter().all(|b| b.result.is_ok())
    }
}

//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheLayout;
use crate::orchestrator::{FailurePolicy, PipelineConfig};
use crate::provider::{FetchConfig, ServiceCatalog, ServiceConfigError};

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub service: ServiceSettings,
    pub download: DownloadSettings,
    pub mosaic: MosaicSettings,
    pub logging: LoggingSettings,
}

/// Tile service selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    /// Service used when none is given on the command line
    pub name: String,
    /// JSON catalog to read instead of the built-in one
    pub services_file: Option<PathBuf>,
}

/// Download configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    /// Timeout in seconds for a single HTTP attempt.
    pub timeout: u64,
    /// Attempts per tile, including the first.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Concurrent tile fetches per boundary.
    pub parallel: usize,
}

/// Mosaic output configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicSettings {
    pub jpeg_quality: u8,
    pub failure_policy: FailurePolicy,
    pub cache_layout: CacheLayout,
    pub max_tiles: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl ConfigFile {
    /// Fetch settings for [`crate::provider::TileFetcher`].
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::new()
            .with_timeout(Duration::from_secs(self.download.timeout))
            .with_max_retries(self.download.max_retries)
            .with_retry_base_delay(Duration::from_millis(self.download.retry_base_delay_ms))
    }

    /// Pipeline settings for [`crate::orchestrator::MosaicOrchestrator`].
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_fetch(self.fetch_config())
            .with_parallel(self.download.parallel)
            .with_jpeg_quality(self.mosaic.jpeg_quality)
            .with_failure_policy(self.mosaic.failure_policy)
            .with_layout(self.mosaic.cache_layout)
            .with_max_tiles(self.mosaic.max_tiles)
    }

    /// Loads the configured catalog, or the built-in one when no file is set.
    pub fn load_catalog(&self) -> Result<ServiceCatalog, ServiceConfigError> {
        match &self.service.services_file {
            Some(path) => ServiceCatalog::load(path),
            None => ServiceCatalog::builtin(),
        }
    }
}

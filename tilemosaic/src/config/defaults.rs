//! Default values for all configuration settings.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::cache::CacheLayout;
use crate::orchestrator::{FailurePolicy, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_TILES, DEFAULT_PARALLEL};
use crate::provider::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_TIMEOUT_SECS};

/// Service selected when nothing else is configured.
pub const DEFAULT_SERVICE_NAME: &str = "OpenStreetMap";

/// Log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "tilemosaic.log";

/// Default log file path (~/.tilemosaic/tilemosaic.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join(DEFAULT_LOG_FILE_NAME)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            download: DownloadSettings::default(),
            mosaic: MosaicSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVICE_NAME.to_string(),
            services_file: None,
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            parallel: DEFAULT_PARALLEL,
        }
    }
}

impl Default for MosaicSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            failure_policy: FailurePolicy::default(),
            cache_layout: CacheLayout::default(),
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

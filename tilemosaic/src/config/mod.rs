//! User configuration loaded from `~/.tilemosaic/config.ini`.
//!
//! The file maps onto [`ConfigFile`], which converts into the programmatic
//! [`PipelineConfig`](crate::orchestrator::PipelineConfig) and
//! [`FetchConfig`](crate::provider::FetchConfig) used by the library.

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{default_log_file, DEFAULT_LOG_FILE_NAME, DEFAULT_SERVICE_NAME};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, DownloadSettings, LoggingSettings, MosaicSettings, ServiceSettings};

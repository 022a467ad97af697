//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilemosaic::cache::CacheError;
use tilemosaic::config::ConfigFileError;
use tilemosaic::orchestrator::MosaicError;
use tilemosaic::provider::{ProviderError, ServiceConfigError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Service catalog could not be loaded or the service is unknown
    Services(ServiceConfigError),
    /// Bad `--bbox` value
    InvalidBbox(String),
    /// HTTP client could not be created
    Http(ProviderError),
    /// Run aborted before completion
    Mosaic(MosaicError),
    /// Some boundaries failed; the others were written
    PartialFailure { failed: usize, total: usize },
    /// Cache inspection or cleanup failed
    Cache(CacheError),
    /// Async runtime or signal handler setup failed
    Runtime(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Services(ServiceConfigError::UnknownService { .. }) => {
                eprintln!();
                eprintln!("Run `tilemosaic services` to list the configured services.");
            }
            CliError::Mosaic(MosaicError::CacheIo(_)) => {
                eprintln!();
                eprintln!("Check that the output directory exists and is writable.");
            }
            CliError::PartialFailure { .. } => {
                eprintln!();
                eprintln!("See the log file for per-tile details.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Services(e) => write!(f, "{}", e),
            CliError::InvalidBbox(msg) => write!(f, "Invalid --bbox: {}", msg),
            CliError::Http(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Mosaic(e) => write!(f, "{}", e),
            CliError::PartialFailure { failed, total } => {
                write!(f, "{} of {} boundaries failed", failed, total)
            }
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Services(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::Mosaic(e) => Some(e),
            CliError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ServiceConfigError> for CliError {
    fn from(e: ServiceConfigError) -> Self {
        CliError::Services(e)
    }
}

impl From<MosaicError> for CliError {
    fn from(e: MosaicError) -> Self {
        CliError::Mosaic(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Disk failures in the tile and mosaic cache.
///
/// These are fatal to a run: the caller cannot make progress without a
/// writable output directory.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create cache directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {} into place: {source}", .path.display())]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Background disk task did not complete
    #[error("Cache task failed: {0}")]
    Task(String),
}

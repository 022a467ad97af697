use thiserror::Error;

use crate::cache::CacheError;
use crate::coord::{CoordError, TileRange};
use crate::mosaic::AssemblyError;
use crate::provider::{ProviderError, ServiceConfigError};

/// Errors from a pipeline run.
///
/// Most variants affect a single boundary and are reported per boundary.
/// [`MosaicError::is_fatal`] errors stop the whole run.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// Boundary cannot be turned into a tile range
    #[error("Invalid boundary: {0}")]
    InvalidBoundary(#[from] CoordError),

    #[error("Range {range} needs {count} tiles (limit {limit})")]
    TooManyTiles {
        range: TileRange,
        count: usize,
        limit: usize,
    },

    /// Tiles still failing after retries
    #[error("{failed} of {total} tiles failed to fetch: {first}")]
    Network {
        failed: usize,
        total: usize,
        first: ProviderError,
    },

    #[error(transparent)]
    CacheIo(#[from] CacheError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    ServiceConfig(#[from] ServiceConfigError),

    #[error("Session state error: {0}")]
    Session(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl MosaicError {
    /// Returns true for errors that abort the whole run rather than one
    /// boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MosaicError::CacheIo(_) | MosaicError::Cancelled)
    }
}

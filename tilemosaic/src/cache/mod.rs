//! Disk cache for tiles and assembled mosaics.
//!
//! Tiles are stored one file per (service, zoom, x, y) under a cache
//! directory; mosaics sit next to it in the output directory. A mosaic is
//! reused only when [`TileCache::is_mosaic_valid`] agrees.

mod error;
mod layout;
mod store;

pub use error::CacheError;
pub use layout::CacheLayout;
pub use store::{write_atomic, CacheStats, TileCache, CACHE_DIR_NAME};

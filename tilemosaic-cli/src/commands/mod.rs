//! CLI command implementations.
//!
//! - [`cache`] - Tile cache management (stats, clear)
//! - [`fetch`] - Build mosaics for bounding boxes
//! - [`init`] - Configuration initialization
//! - [`services`] - List available tile services

pub mod cache;
pub mod fetch;
pub mod init;
pub mod services;

//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use tilemosaic::cache::TileCache;
use tilemosaic::config::ConfigFile;

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Remove every cached tile (mosaics are kept)
    Clear,
    /// Show tile cache statistics
    Stats,
}

/// Run a cache subcommand against the cache inside `output_dir`.
pub fn run(action: CacheAction, output_dir: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let cache = TileCache::new(output_dir, config.mosaic.cache_layout);
    let cache_dir = cache.cache_dir();

    match action {
        CacheAction::Clear => {
            println!("Clearing tile cache at: {}", cache_dir.display());
            let removed = cache.clear()?;
            println!("Deleted {} files", removed);
        }
        CacheAction::Stats => {
            println!("Tile cache: {}", cache_dir.display());
            let stats = cache.stats()?;
            println!("  Tiles: {}", stats.tile_files);
            println!("  Size:  {}", format_bytes(stats.total_bytes));
            if stats.temp_files > 0 {
                println!("  Leftover temp files: {}", stats.temp_files);
            }
        }
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

//! TileMosaic CLI - Command-line interface
//!
//! This binary provides a command-line interface to the TileMosaic library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tilemosaic::cache::CacheLayout;
use tilemosaic::orchestrator::DEFAULT_PREFIX;

use commands::cache::CacheAction;
use commands::fetch::FetchArgs;

/// Cache file naming selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// `{service}_{z}_{x}_{y}.tile` tiles and `.jpg` mosaics
    Delimited,
    /// Separator-free names used by older caches
    Legacy,
}

impl From<LayoutArg> for CacheLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Delimited => CacheLayout::Delimited,
            LayoutArg::Legacy => CacheLayout::Legacy,
        }
    }
}

#[derive(Parser)]
#[command(name = "tilemosaic")]
#[command(version = tilemosaic::VERSION)]
#[command(about = "Stitch slippy-map tiles into cached mosaic images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a mosaic for each bounding box
    Fetch {
        /// Bounding box as west,south,east,north in degrees (repeatable)
        #[arg(long = "bbox", required = true, allow_hyphen_values = true)]
        bboxes: Vec<String>,

        /// Zoom level (0-22)
        #[arg(long)]
        zoom: u8,

        /// Directory for mosaics and the tile cache
        #[arg(long)]
        output_dir: PathBuf,

        /// Mosaic file name prefix
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,

        /// User-Agent sent to the tile server
        #[arg(long)]
        user_agent: Option<String>,

        /// Download and write files (without this, only report what would happen)
        #[arg(long)]
        run: bool,

        /// Tile service name (see `tilemosaic services`)
        #[arg(long)]
        service: Option<String>,

        /// Cache file naming, overrides the config file
        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// List available tile services
    Services {
        /// Service catalog JSON to list instead of the configured one
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Inspect or clear the tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        /// Directory holding the tile cache
        #[arg(long, global = true, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Write the default configuration file
    Init,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch {
            bboxes,
            zoom,
            output_dir,
            prefix,
            user_agent,
            run,
            service,
            layout,
            debug,
        } => commands::fetch::run(FetchArgs {
            bboxes,
            zoom,
            output_dir,
            prefix,
            user_agent,
            run,
            service,
            layout: layout.map(CacheLayout::from),
            debug,
        }),
        Commands::Services { file } => commands::services::run(file),
        Commands::Cache { action, output_dir } => commands::cache::run(action, &output_dir),
        Commands::Init => commands::init::run(),
    };

    if let Err(e) = result {
        e.exit();
    }
}

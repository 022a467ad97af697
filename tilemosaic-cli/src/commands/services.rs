//! Services command - list the tile services that can be selected.

use std::path::PathBuf;

use tilemosaic::config::ConfigFile;
use tilemosaic::provider::ServiceCatalog;

use crate::error::CliError;

/// Run the services command.
///
/// Lists the catalog at `file` if given, otherwise the configured catalog.
pub fn run(file: Option<PathBuf>) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();

    let (catalog, source) = match file.or_else(|| config.service.services_file.clone()) {
        Some(path) => {
            let catalog = ServiceCatalog::load(&path)?;
            (catalog, path.display().to_string())
        }
        None => (ServiceCatalog::builtin()?, "built-in".to_string()),
    };

    println!("Tile services ({}):", source);
    for entry in catalog.entries() {
        let marker = if entry.service == config.service.name {
            "*"
        } else {
            " "
        };
        println!("  {} {}", marker, entry.service);
        println!("      {}", entry.url);
    }
    println!();
    println!("* default service (set [service] name in the config file)");
    Ok(())
}

//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let services_file = config
        .service
        .services_file
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[service]
; Tile service used when --service is not given (default: OpenStreetMap)
; Run `tilemosaic services` to list the available names
name = {}
; Optional JSON catalog replacing the built-in service list:
;   {{"Slippy Maps": [{{"service": "Name", "url": "https://host/{{z}}/{{x}}/{{y}}.png"}}]}}
services_file = {}

[download]
; Timeout in seconds for a single HTTP attempt (default: 30)
timeout = {}
; Attempts per tile including the first (default: 3)
max_retries = {}
; Delay before the first retry, doubled on each further retry (default: 200)
retry_base_delay_ms = {}
; Concurrent tile fetches per boundary, 1-32 (default: 6)
; Public tile servers throttle aggressive clients, keep this small
parallel = {}

[mosaic]
; JPEG quality of assembled mosaics, 1-100 (default: 90)
jpeg_quality = {}
; What to do when tiles still fail after retries:
;   abort       - skip the boundary, no mosaic is written
;   placeholder - paint failed tiles magenta and write a partial mosaic
failure_policy = {}
; Cache file naming:
;   delimited - {{service}}_{{z}}_{{x}}_{{y}}.tile, mosaics as .jpg
;   legacy    - {{service}}{{z}}{{x}}{{y}}.png, mosaics as .png (reads older caches)
cache_layout = {}
; Boundaries needing more tiles than this are rejected (default: 1024)
max_tiles = {}

[logging]
; Log file path (default: ~/.tilemosaic/tilemosaic.log)
file = {}
"#,
        config.service.name,
        services_file,
        config.download.timeout,
        config.download.max_retries,
        config.download.retry_base_delay_ms,
        config.download.parallel,
        config.mosaic.jpeg_quality,
        config.mosaic.failure_policy,
        config.mosaic.cache_layout,
        config.mosaic.max_tiles,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLayout;
    use crate::config::ConfigFileError;
    use crate::orchestrator::FailurePolicy;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_written_config_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.service.name = "Esri World Imagery".to_string();
        config.service.services_file = Some(PathBuf::from("/srv/catalog.json"));
        config.download.parallel = 3;
        config.mosaic.failure_policy = FailurePolicy::Placeholder;
        config.mosaic.cache_layout = CacheLayout::Legacy;
        config.logging.file = PathBuf::from("/tmp/tm.log");
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_config_string_has_all_sections() {
        let content = to_config_string(&ConfigFile::default());
        for section in ["[service]", "[download]", "[mosaic]", "[logging]"] {
            assert!(content.contains(section), "missing {section}");
        }
        assert!(content.contains("failure_policy = abort"));
        assert!(content.contains("cache_layout = delimited"));
        assert!(content.contains("services_file = \n"));
    }

    #[test]
    fn test_save_creates_parent_directory() -> Result<(), ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.ini");
        ConfigFile::default().save_to(&path)?;
        assert!(path.exists());
        Ok(())
    }
}

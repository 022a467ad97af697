//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::orchestrator::MAX_PARALLEL;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [service] section
    if let Some(section) = ini.section(Some("service")) {
        if let Some(v) = section.get("name") {
            let v = v.trim();
            if !v.is_empty() {
                config.service.name = v.to_string();
            }
        }
        if let Some(v) = section.get("services_file") {
            let v = v.trim();
            if !v.is_empty() {
                config.service.services_file = Some(expand_tilde(v));
            }
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = parse_number::<u64>(section, "download", "timeout", "seconds")? {
            if v == 0 {
                return Err(invalid("download", "timeout", "0", "must be at least 1 second"));
            }
            config.download.timeout = v;
        }
        if let Some(v) = parse_number::<u32>(section, "download", "max_retries", "attempts")? {
            if v == 0 {
                return Err(invalid("download", "max_retries", "0", "must be at least 1"));
            }
            config.download.max_retries = v;
        }
        if let Some(v) =
            parse_number::<u64>(section, "download", "retry_base_delay_ms", "milliseconds")?
        {
            config.download.retry_base_delay_ms = v;
        }
        if let Some(v) = parse_number::<usize>(section, "download", "parallel", "workers")? {
            if v == 0 || v > MAX_PARALLEL {
                return Err(invalid(
                    "download",
                    "parallel",
                    &v.to_string(),
                    "must be between 1 and 32",
                ));
            }
            config.download.parallel = v;
        }
    }

    // [mosaic] section
    if let Some(section) = ini.section(Some("mosaic")) {
        if let Some(v) = parse_number::<u8>(section, "mosaic", "jpeg_quality", "quality")? {
            if v == 0 || v > 100 {
                return Err(invalid(
                    "mosaic",
                    "jpeg_quality",
                    &v.to_string(),
                    "must be between 1 and 100",
                ));
            }
            config.mosaic.jpeg_quality = v;
        }
        if let Some(v) = section.get("failure_policy") {
            config.mosaic.failure_policy = v.parse().map_err(|_| {
                invalid("mosaic", "failure_policy", v, "must be 'abort' or 'placeholder'")
            })?;
        }
        if let Some(v) = section.get("cache_layout") {
            config.mosaic.cache_layout = v.parse().map_err(|_| {
                invalid("mosaic", "cache_layout", v, "must be 'delimited' or 'legacy'")
            })?;
        }
        if let Some(v) = parse_number::<usize>(section, "mosaic", "max_tiles", "tiles")? {
            if v == 0 {
                return Err(invalid("mosaic", "max_tiles", "0", "must be at least 1"));
            }
            config.mosaic.max_tiles = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Reads `key` as a number. Empty values count as unset.
fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    unit: &str,
) -> Result<Option<T>, ConfigFileError> {
    match section.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            invalid(
                section_name,
                key,
                v,
                &format!("must be a positive integer ({})", unit),
            )
        }),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLayout;
    use crate::config::defaults::*;
    use crate::orchestrator::FailurePolicy;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_full_config() {
        let config = load(
            r#"
[service]
name = OpenTopoMap
services_file = /etc/tilemosaic/services.json

[download]
timeout = 10
max_retries = 5
retry_base_delay_ms = 50
parallel = 12

[mosaic]
jpeg_quality = 75
failure_policy = placeholder
cache_layout = legacy
max_tiles = 64

[logging]
file = /var/log/tilemosaic.log
"#,
        )
        .unwrap();

        assert_eq!(config.service.name, "OpenTopoMap");
        assert_eq!(
            config.service.services_file,
            Some(PathBuf::from("/etc/tilemosaic/services.json"))
        );
        assert_eq!(config.download.timeout, 10);
        assert_eq!(config.download.max_retries, 5);
        assert_eq!(config.download.retry_base_delay_ms, 50);
        assert_eq!(config.download.parallel, 12);
        assert_eq!(config.mosaic.jpeg_quality, 75);
        assert_eq!(config.mosaic.failure_policy, FailurePolicy::Placeholder);
        assert_eq!(config.mosaic.cache_layout, CacheLayout::Legacy);
        assert_eq!(config.mosaic.max_tiles, 64);
        assert_eq!(config.logging.file, PathBuf::from("/var/log/tilemosaic.log"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = load("[download]\ntimeout = 5\n").unwrap();

        assert_eq!(config.download.timeout, 5);
        assert_eq!(config.download.parallel, ConfigFile::default().download.parallel);
        assert_eq!(config.service.name, DEFAULT_SERVICE_NAME);
        assert!(config.service.services_file.is_none());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = load("[service]\nservices_file =\n[download]\nparallel =\n").unwrap();
        assert!(config.service.services_file.is_none());
        assert_eq!(config.download.parallel, ConfigFile::default().download.parallel);
    }

    #[test]
    fn test_invalid_timeout() {
        let err = load("[download]\ntimeout = soon\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section,
                key,
                value,
                ..
            } => {
                assert_eq!(section, "download");
                assert_eq!(key, "timeout");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parallel_out_of_range() {
        let err = load("[download]\nparallel = 64\n").unwrap_err();
        assert!(err.to_string().contains("download.parallel"));
        assert!(err.to_string().contains("between 1 and 32"));
    }

    #[test]
    fn test_invalid_quality() {
        assert!(load("[mosaic]\njpeg_quality = 0\n").is_err());
        assert!(load("[mosaic]\njpeg_quality = 101\n").is_err());
    }

    #[test]
    fn test_invalid_failure_policy() {
        let err = load("[mosaic]\nfailure_policy = ignore\n").unwrap_err();
        assert!(err.to_string().contains("failure_policy"));
        assert!(err.to_string().contains("'abort' or 'placeholder'"));
    }

    #[test]
    fn test_invalid_layout() {
        let err = load("[mosaic]\ncache_layout = flat\n").unwrap_err();
        assert!(err.to_string().contains("cache_layout"));
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/tiles/services.json");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("tiles/services.json"));
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}

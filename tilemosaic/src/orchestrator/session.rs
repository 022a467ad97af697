//! Sticky state carried between runs.
//!
//! The caller owns a [`SessionState`], passes it into every run and persists
//! it afterwards. All four fields are opaque strings so a host application
//! can store and restore them verbatim.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::MosaicError;
use crate::cache::write_atomic;
use crate::coord::TileRangeFingerprint;
use crate::provider::{ServiceCatalog, ServiceConfig, ServiceConfigError};

/// File name the CLI uses for session state inside the output directory.
pub const SESSION_FILE_NAME: &str = "tilemosaic-session.json";

/// Separates per-boundary fingerprints inside `last_fingerprint`.
const FINGERPRINT_SEPARATOR: char = ';';

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Fingerprints of the last successful run, one per boundary in order.
    /// Empty entries mark boundaries without a reusable mosaic.
    pub last_fingerprint: String,
    pub service_name: String,
    pub url_template: String,
    /// Raw catalog document the service was picked from
    pub service_list_json: String,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads state from a JSON file, returning the default when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self, MosaicError> {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                MosaicError::Session(format!("invalid session file {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(MosaicError::Session(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Writes state to a JSON file atomically.
    pub fn save(&self, path: &Path) -> Result<(), MosaicError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| MosaicError::Session(format!("failed to serialise session: {}", e)))?;
        write_atomic(path, &json)?;
        Ok(())
    }

    /// Picks `name` from `catalog` and records it.
    ///
    /// Switching to a different service or URL clears the stored
    /// fingerprints, since every cache file name is service-qualified.
    pub fn select_service(
        &mut self,
        catalog: &ServiceCatalog,
        name: &str,
    ) -> Result<ServiceConfig, ServiceConfigError> {
        let service = catalog.select(name)?;
        self.record_service(&service);
        self.service_list_json = catalog.raw_json().to_string();
        Ok(service)
    }

    /// Records `service` as the current one, clearing fingerprints if it
    /// differs from the stored service.
    pub fn record_service(&mut self, service: &ServiceConfig) {
        if self.service_name != service.name || self.url_template != service.url_template {
            self.last_fingerprint.clear();
            self.service_name = service.name.clone();
            self.url_template = service.url_template.clone();
        }
    }

    /// The stored service, if one has been selected.
    pub fn service(&self) -> Option<ServiceConfig> {
        if self.service_name.is_empty() || self.url_template.is_empty() {
            None
        } else {
            Some(ServiceConfig::new(&self.service_name, &self.url_template))
        }
    }

    /// Stored fingerprint of the boundary at `index`.
    pub fn fingerprint_for(&self, index: usize) -> Option<&str> {
        if self.last_fingerprint.is_empty() {
            return None;
        }
        self.last_fingerprint
            .split(FINGERPRINT_SEPARATOR)
            .nth(index)
            .filter(|fp| !fp.is_empty())
    }

    /// Replaces the stored fingerprints with one entry per boundary.
    pub fn set_fingerprints(&mut self, fingerprints: &[Option<TileRangeFingerprint>]) {
        let sep = FINGERPRINT_SEPARATOR.to_string();
        self.last_fingerprint = fingerprints
            .iter()
            .map(|fp| fp.as_ref().map(|f| f.as_str()).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(&sep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileRange;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{"Slippy Maps":[
        {"service":"One","url":"https://one.test/{z}/{x}/{y}.png"},
        {"service":"Two","url":"https://two.test/{z}/{x}/{y}.png"}
    ]}"#;

    fn fp(zoom: u8) -> TileRangeFingerprint {
        TileRange::new(zoom, 0, 0, 0, 0).unwrap().fingerprint()
    }

    #[test]
    fn test_single_fingerprint_is_plain_string() {
        let mut session = SessionState::new();
        session.set_fingerprints(&[Some(fp(3))]);

        assert_eq!(session.last_fingerprint, "3_0_0_0_0");
        assert_eq!(session.fingerprint_for(0), Some("3_0_0_0_0"));
        assert_eq!(session.fingerprint_for(1), None);
    }

    #[test]
    fn test_multiple_fingerprints() {
        let mut session = SessionState::new();
        session.set_fingerprints(&[Some(fp(1)), None, Some(fp(2))]);

        assert_eq!(session.last_fingerprint, "1_0_0_0_0;;2_0_0_0_0");
        assert_eq!(session.fingerprint_for(0), Some("1_0_0_0_0"));
        assert_eq!(session.fingerprint_for(1), None);
        assert_eq!(session.fingerprint_for(2), Some("2_0_0_0_0"));
    }

    #[test]
    fn test_empty_session_has_no_fingerprint() {
        assert_eq!(SessionState::new().fingerprint_for(0), None);
    }

    #[test]
    fn test_switching_service_clears_fingerprint() {
        let catalog = ServiceCatalog::parse(CATALOG).unwrap();
        let mut session = SessionState::new();

        session.select_service(&catalog, "One").unwrap();
        session.set_fingerprints(&[Some(fp(4))]);

        session.select_service(&catalog, "One").unwrap();
        assert_eq!(session.fingerprint_for(0), Some("4_0_0_0_0"), "Same service keeps state");

        let two = session.select_service(&catalog, "Two").unwrap();
        assert_eq!(two.url_template, "https://two.test/{z}/{x}/{y}.png");
        assert_eq!(session.fingerprint_for(0), None);
        assert_eq!(session.service_name, "Two");
        assert_eq!(session.service_list_json, CATALOG);
    }

    #[test]
    fn test_unknown_service_leaves_state_untouched() {
        let catalog = ServiceCatalog::parse(CATALOG).unwrap();
        let mut session = SessionState::new();
        session.select_service(&catalog, "One").unwrap();
        let before = session.clone();

        assert!(session.select_service(&catalog, "Three").is_err());
        assert_eq!(session, before);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SESSION_FILE_NAME);

        let mut session = SessionState::new();
        session.record_service(&ServiceConfig::new("One", "https://one.test/{z}/{x}/{y}.png"));
        session.set_fingerprints(&[Some(fp(5))]);
        session.save(&path).unwrap();

        let loaded = SessionState::load(&path).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.service().unwrap().name, "One");
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let session = SessionState::load(&dir.path().join("none.json")).unwrap();
        assert_eq!(session, SessionState::default());
        assert!(session.service().is_none());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SessionState::load(&path),
            Err(MosaicError::Session(_))
        ));
    }
}

//! Tile service catalog.
//!
//! A catalog is a JSON document of the form
//!
//! ```json
//! { "Slippy Maps": [ { "service": "OpenStreetMap", "url": "https://.../{z}/{x}/{y}.png" } ] }
//! ```
//!
//! Selecting a service by name yields a [`ServiceConfig`] for the pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key of the service list inside a catalog document.
pub const CATALOG_KEY: &str = "Slippy Maps";

/// Catalog shipped with the crate, used when no catalog file is configured.
pub const BUILTIN_CATALOG: &str = r#"{
  "Slippy Maps": [
    { "service": "OpenStreetMap", "url": "https://tile.openstreetmap.org/{z}/{x}/{y}.png" },
    { "service": "OpenTopoMap", "url": "https://tile.opentopomap.org/{z}/{x}/{y}.png" },
    { "service": "Esri World Imagery", "url": "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}" },
    { "service": "Esri World Topo", "url": "https://server.arcgisonline.com/ArcGIS/rest/services/World_Topo_Map/MapServer/tile/{z}/{y}/{x}" },
    { "service": "USGS Imagery", "url": "https://basemap.nationalmap.gov/arcgis/rest/services/USGSImageryOnly/MapServer/tile/{z}/{y}/{x}" }
  ]
}"#;

/// Errors raised while loading or querying a service catalog.
#[derive(Debug, Error)]
pub enum ServiceConfigError {
    #[error("Malformed service catalog: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Service catalog has no \"Slippy Maps\" list")]
    MissingList,

    #[error("Service catalog lists no services")]
    Empty,

    #[error("Unknown service '{name}' (available: {})", .available.join(", "))]
    UnknownService { name: String, available: Vec<String> },

    #[error("Failed to read service catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One entry of a service catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub service: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(rename = "Slippy Maps")]
    slippy_maps: Option<Vec<ServiceEntry>>,
}

/// A selected tile service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Display name; also qualifies cache file names
    pub name: String,
    /// URL with `{z}`, `{x}`, `{y}` placeholders
    pub url_template: String,
    /// Value sent as `User-Agent`, if any
    pub access_header: Option<String>,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            access_header: None,
        }
    }

    pub fn with_access_header(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.access_header = if value.trim().is_empty() {
            None
        } else {
            Some(value)
        };
        self
    }
}

/// A parsed list of available tile services.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    entries: Vec<ServiceEntry>,
    raw: String,
}

impl ServiceCatalog {
    /// Parses a catalog document, keeping the raw text for session storage.
    pub fn parse(json: &str) -> Result<Self, ServiceConfigError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        let entries = doc.slippy_maps.ok_or(ServiceConfigError::MissingList)?;
        if entries.is_empty() {
            return Err(ServiceConfigError::Empty);
        }
        Ok(Self {
            entries,
            raw: json.to_string(),
        })
    }

    /// Reads and parses a catalog file.
    pub fn load(path: &Path) -> Result<Self, ServiceConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ServiceConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&json)
    }

    /// The catalog bundled with the crate.
    pub fn builtin() -> Result<Self, ServiceConfigError> {
        Self::parse(BUILTIN_CATALOG)
    }

    pub fn entries(&self) -> &[ServiceEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.service.as_str())
    }

    /// The original document text.
    pub fn raw_json(&self) -> &str {
        &self.raw
    }

    /// Returns the first listed service.
    pub fn default_service(&self) -> ServiceConfig {
        // parse() rejects empty catalogs
        let entry = &self.entries[0];
        ServiceConfig::new(&entry.service, &entry.url)
    }

    /// Looks up a service by exact name.
    pub fn select(&self, name: &str) -> Result<ServiceConfig, ServiceConfigError> {
        self.entries
            .iter()
            .find(|e| e.service == name)
            .map(|e| ServiceConfig::new(&e.service, &e.url))
            .ok_or_else(|| ServiceConfigError::UnknownService {
                name: name.to_string(),
                available: self.names().map(str::to_string).collect(),
            })
    }
}

/// Selects a service from a catalog document in one step.
pub fn select_service(
    catalog_json: &str,
    name: &str,
) -> Result<ServiceConfig, ServiceConfigError> {
    ServiceCatalog::parse(catalog_json)?.select(name)
}

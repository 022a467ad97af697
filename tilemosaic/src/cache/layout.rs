//! File naming schemes for cached tiles and mosaics.

use std::fmt;
use std::str::FromStr;

use crate::coord::{TileIndex, TileRange, TileRangeFingerprint};

/// How tile files, fingerprints, comments and mosaic files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheLayout {
    /// `_`-separated fields; mosaic extension matches its JPEG content.
    #[default]
    Delimited,
    /// Separator-free names compatible with caches written by earlier
    /// releases. Mosaics keep a `.png` name while holding JPEG bytes.
    Legacy,
}

impl CacheLayout {
    /// Normalises a service name into a file-name component.
    ///
    /// Whitespace is always removed. The delimited layout also replaces any
    /// character that is not ASCII alphanumeric, `-` or `.` with `_`.
    pub fn service_key(&self, service: &str) -> String {
        let compact = service.chars().filter(|c| !c.is_whitespace());
        match self {
            CacheLayout::Legacy => compact.collect(),
            CacheLayout::Delimited => compact
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect(),
        }
    }

    /// File name of one cached tile.
    pub fn tile_file_name(&self, service: &str, tile: TileIndex) -> String {
        let key = self.service_key(service);
        match self {
            CacheLayout::Delimited => {
                format!("{}_{}_{}_{}.tile", key, tile.zoom, tile.x, tile.y)
            }
            CacheLayout::Legacy => format!("{}{}{}{}.png", key, tile.zoom, tile.x, tile.y),
        }
    }

    pub fn fingerprint(&self, range: &TileRange) -> TileRangeFingerprint {
        match self {
            CacheLayout::Delimited => range.fingerprint(),
            CacheLayout::Legacy => range.legacy_fingerprint(),
        }
    }

    /// Comment embedded in a mosaic built from `service` over the range
    /// identified by `fingerprint`.
    pub fn mosaic_comment(&self, service: &str, fingerprint: &TileRangeFingerprint) -> String {
        let key = self.service_key(service);
        match self {
            CacheLayout::Delimited => format!("{}@{}", key, fingerprint),
            CacheLayout::Legacy => format!("{}{}", key, fingerprint),
        }
    }

    /// File name of the mosaic for the boundary at `index`.
    pub fn mosaic_file_name(&self, prefix: &str, index: usize) -> String {
        match self {
            CacheLayout::Delimited => format!("{}_{}.jpg", prefix, index),
            CacheLayout::Legacy => format!("{}_{}.png", prefix, index),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheLayout::Delimited => "delimited",
            CacheLayout::Legacy => "legacy",
        }
    }
}

impl fmt::Display for CacheLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delimited" => Ok(CacheLayout::Delimited),
            "legacy" => Ok(CacheLayout::Legacy),
            other => Err(format!(
                "unknown cache layout '{}' (expected delimited or legacy)",
                other
            )),
        }
    }
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use super::error::CacheError;
use super::layout::CacheLayout;
use crate::coord::{TileIndex, TileRange, TileRangeFingerprint};
use crate::mosaic::read_jpeg_comment;

/// Name of the tile cache directory inside the output directory.
pub const CACHE_DIR_NAME: &str = "HeronCache";

/// Marker in the names of in-progress temporary files.
const TEMP_MARKER: &str = ".tmp-";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `data` to `path` so that readers see either the old file, no file,
/// or the complete new file.
///
/// The bytes go to a uniquely named sibling temp file first, which is then
/// renamed over `path`.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(
        "{}{}{}-{}",
        file_name,
        TEMP_MARKER,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()
    };
    if let Err(source) = write() {
        let _ = fs::remove_file(&temp_path);
        return Err(CacheError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        CacheError::Rename {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Summary of what a cache directory holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub tile_files: usize,
    pub total_bytes: u64,
    /// Leftovers of interrupted writes
    pub temp_files: usize,
}

/// On-disk store for tiles and mosaics under one output directory.
///
/// Layout:
///
/// ```text
/// {output_dir}/HeronCache/<tile file>   one per (service, zoom, x, y)
/// {output_dir}/<mosaic file>            one per boundary
/// ```
///
/// File existence is the only state; there is no index.
#[derive(Debug, Clone)]
pub struct TileCache {
    output_dir: PathBuf,
    cache_dir: PathBuf,
    layout: CacheLayout,
}

impl TileCache {
    pub fn new(output_dir: impl Into<PathBuf>, layout: CacheLayout) -> Self {
        let output_dir = output_dir.into();
        let cache_dir = output_dir.join(CACHE_DIR_NAME);
        Self {
            output_dir,
            cache_dir,
            layout,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn layout(&self) -> CacheLayout {
        self.layout
    }

    /// Path of the cached file for one tile of one service.
    pub fn tile_path(&self, service: &str, tile: TileIndex) -> PathBuf {
        self.cache_dir.join(self.layout.tile_file_name(service, tile))
    }

    /// Paths of every tile in `range`, in row-major order.
    pub fn tile_paths(&self, service: &str, range: &TileRange) -> Vec<PathBuf> {
        range.tiles().map(|t| self.tile_path(service, t)).collect()
    }

    /// Path of the mosaic for the boundary at `index`.
    pub fn mosaic_path(&self, prefix: &str, index: usize) -> PathBuf {
        self.output_dir.join(self.layout.mosaic_file_name(prefix, index))
    }

    /// Plain existence check. Content is not validated.
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Creates the cache directory (and output directory) if absent.
    pub fn ensure_cache_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::CreateDir {
            path: self.cache_dir.clone(),
            source,
        })
    }

    /// Stores a tile atomically and returns its path.
    pub fn write_tile(
        &self,
        service: &str,
        tile: TileIndex,
        data: &[u8],
    ) -> Result<PathBuf, CacheError> {
        let path = self.tile_path(service, tile);
        write_atomic(&path, data)?;
        trace!(tile = %tile, path = %path.display(), bytes = data.len(), "Tile cached");
        Ok(path)
    }

    /// Reads a cached tile, returning `None` if it is not cached.
    pub fn read_tile(
        &self,
        service: &str,
        tile: TileIndex,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.tile_path(service, tile);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Read { path, source }),
        }
    }

    /// Decides whether an existing mosaic can be reused as is.
    ///
    /// All of the following must hold:
    /// - `stored` equals `current`
    /// - every file in `tile_paths` exists
    /// - `mosaic_path` exists
    /// - the mosaic's embedded comment equals `expected_comment`
    pub fn is_mosaic_valid(
        stored: Option<&str>,
        current: &TileRangeFingerprint,
        tile_paths: &[PathBuf],
        mosaic_path: &Path,
        expected_comment: &str,
    ) -> bool {
        if stored != Some(current.as_str()) {
            debug!(
                stored = stored.unwrap_or(""),
                current = %current,
                "Fingerprint changed"
            );
            return false;
        }

        if let Some(missing) = tile_paths.iter().find(|p| !Self::exists(p)) {
            debug!(path = %missing.display(), "Cached tile missing");
            return false;
        }

        let data = match fs::read(mosaic_path) {
            Ok(data) => data,
            Err(_) => {
                debug!(path = %mosaic_path.display(), "Mosaic missing");
                return false;
            }
        };

        match read_jpeg_comment(&data) {
            Some(comment) if comment == expected_comment => true,
            other => {
                debug!(
                    path = %mosaic_path.display(),
                    found = other.as_deref().unwrap_or(""),
                    expected = expected_comment,
                    "Mosaic comment mismatch"
                );
                false
            }
        }
    }

    /// Counts the files in the cache directory.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();
        for (path, len) in self.entries()? {
            if is_temp_file(&path) {
                stats.temp_files += 1;
            } else {
                stats.tile_files += 1;
                stats.total_bytes += len;
            }
        }
        Ok(stats)
    }

    /// Deletes every file in the cache directory and returns the count.
    ///
    /// Mosaics in the output directory are left alone.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for (path, _) in self.entries()? {
            fs::remove_file(&path).map_err(|source| CacheError::Remove {
                path: path.clone(),
                source,
            })?;
            removed += 1;
        }
        debug!(dir = %self.cache_dir.display(), removed = removed, "Cache cleared");
        Ok(removed)
    }

    fn entries(&self) -> Result<Vec<(PathBuf, u64)>, CacheError> {
        let read_err = |source| CacheError::Read {
            path: self.cache_dir.clone(),
            source,
        };

        let dir = match fs::read_dir(&self.cache_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(e)),
        };

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry.map_err(read_err)?;
            let meta = entry.metadata().map_err(read_err)?;
            if meta.is_file() {
                entries.push((entry.path(), meta.len()));
            }
        }
        Ok(entries)
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().contains(TEMP_MARKER))
        .unwrap_or(false)
}

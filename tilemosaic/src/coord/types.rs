//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported slippy-map zoom levels
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Edge length of one slippy-map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// A geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude in degrees, positive east
    pub lon: f64,
    /// Latitude in degrees, positive north
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}

/// Axis-aligned geographic bounding box.
///
/// Corners are normalised on construction so that `west <= east` and
/// `south <= north`. The box is not validated here; [`super::tile_range_for`]
/// rejects degenerate or out-of-range boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBoundingBox {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
}

impl GeoBoundingBox {
    /// Creates a bounding box from two opposite corners given as
    /// `(west, south, east, north)`. Swapped corners are reordered.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        let (west, east) = if west <= east { (west, east) } else { (east, west) };
        let (south, north) = if south <= north { (south, north) } else { (north, south) };
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    /// Returns true when the box encloses zero area.
    pub fn is_degenerate(&self) -> bool {
        self.east - self.west <= 0.0 || self.north - self.south <= 0.0
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.west.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
    }
}

impl fmt::Display for GeoBoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}]-[{:.6}, {:.6}]",
            self.west, self.south, self.east, self.north
        )
    }
}

/// An input boundary shape, already sampled into geographic points.
///
/// Only the axis-aligned extent of the shape matters for tile coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    points: Vec<GeoPoint>,
}

impl Boundary {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Computes the bounding box of all boundary points.
    ///
    /// # Errors
    ///
    /// Returns `CoordError::TooFewPoints` for an empty boundary and
    /// `CoordError::NonFinite` if any point is NaN or infinite.
    pub fn bounding_box(&self) -> Result<GeoBoundingBox, CoordError> {
        let first = self.points.first().ok_or(CoordError::TooFewPoints(0))?;
        if let Some(bad) = self.points.iter().find(|p| !p.is_finite()) {
            return Err(CoordError::NonFinite(bad.lon, bad.lat));
        }

        let (mut west, mut south) = (first.lon, first.lat);
        let (mut east, mut north) = (first.lon, first.lat);
        for p in &self.points[1..] {
            west = west.min(p.lon);
            east = east.max(p.lon);
            south = south.min(p.lat);
            north = north.max(p.lat);
        }

        Ok(GeoBoundingBox::new(west, south, east, north))
    }
}

impl From<GeoBoundingBox> for Boundary {
    fn from(bbox: GeoBoundingBox) -> Self {
        Self::new(vec![
            GeoPoint::new(bbox.west, bbox.south),
            GeoPoint::new(bbox.east, bbox.south),
            GeoPoint::new(bbox.east, bbox.north),
            GeoPoint::new(bbox.west, bbox.north),
        ])
    }
}

/// Index of one 256×256 tile in the slippy-map scheme.
///
/// For a given zoom, `0 <= x, y < 2^zoom`. `x` grows eastward,
/// `y` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileIndex {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Rectangular set of tiles covering a bounding box at one zoom level.
///
/// Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRange {
    zoom: u8,
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

impl TileRange {
    /// Creates a tile range, checking the zoom and that every index lies
    /// inside the `2^zoom` grid.
    pub fn new(
        zoom: u8,
        x_min: u32,
        x_max: u32,
        y_min: u32,
        y_max: u32,
    ) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = 1u32 << zoom;
        if x_min > x_max || y_min > y_max || x_max >= n || y_max >= n {
            return Err(CoordError::InvalidRange {
                zoom,
                x_min,
                x_max,
                y_min,
                y_max,
            });
        }
        Ok(Self {
            zoom,
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn x_min(&self) -> u32 {
        self.x_min
    }

    pub fn x_max(&self) -> u32 {
        self.x_max
    }

    pub fn y_min(&self) -> u32 {
        self.y_min
    }

    pub fn y_max(&self) -> u32 {
        self.y_max
    }

    /// Number of tile columns.
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    /// Number of tile rows.
    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    pub fn tile_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Mosaic width in pixels.
    pub fn pixel_width(&self) -> u32 {
        self.width() * TILE_SIZE
    }

    /// Mosaic height in pixels.
    pub fn pixel_height(&self) -> u32 {
        self.height() * TILE_SIZE
    }

    pub fn contains(&self, tile: &TileIndex) -> bool {
        tile.zoom == self.zoom
            && (self.x_min..=self.x_max).contains(&tile.x)
            && (self.y_min..=self.y_max).contains(&tile.y)
    }

    /// Pixel offset of a tile's top-left corner inside the mosaic.
    ///
    /// `tile` must lie inside the range.
    pub fn pixel_offset(&self, tile: &TileIndex) -> (u32, u32) {
        debug_assert!(self.contains(tile), "tile {} outside range {}", tile, self);
        (
            (tile.x - self.x_min) * TILE_SIZE,
            (tile.y - self.y_min) * TILE_SIZE,
        )
    }

    /// Iterates the tiles top-to-bottom, left-to-right.
    pub fn tiles(&self) -> TileRangeIter {
        TileRangeIter {
            range: *self,
            next: 0,
        }
    }

    /// Fingerprint with `_` separators between fields.
    pub fn fingerprint(&self) -> TileRangeFingerprint {
        TileRangeFingerprint(format!(
            "{}_{}_{}_{}_{}",
            self.zoom, self.x_min, self.y_min, self.x_max, self.y_max
        ))
    }

    /// Fingerprint in the inherited separator-free form.
    ///
    /// Different ranges can collide here (zoom 1, x 23 vs zoom 12, x 3).
    pub fn legacy_fingerprint(&self) -> TileRangeFingerprint {
        TileRangeFingerprint(format!(
            "{}{}{}{}{}",
            self.zoom, self.x_min, self.y_min, self.x_max, self.y_max
        ))
    }
}

impl fmt::Display for TileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z{} x{}..={} y{}..={}",
            self.zoom, self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

/// Row-major iterator over a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    next: usize,
}

impl Iterator for TileRangeIter {
    type Item = TileIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.range.tile_count() {
            return None;
        }

        let width = self.range.width() as usize;
        let row = (self.next / width) as u32;
        let col = (self.next % width) as u32;
        self.next += 1;

        Some(TileIndex {
            zoom: self.range.zoom,
            x: self.range.x_min + col,
            y: self.range.y_min + row,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.range.tile_count() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileRangeIter {}

/// String that identifies a [`TileRange`] for cache validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileRangeFingerprint(String);

impl TileRangeFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TileRangeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur during coordinate conversion.
///
/// Every variant means the boundary cannot be turned into a tile range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is outside the Web Mercator range
    #[error("Invalid latitude: {0} (must be between -85.05112878 and 85.05112878)")]
    InvalidLatitude(f64),

    /// Longitude is outside -180.0 to 180.0
    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    /// Zoom level above the supported maximum
    #[error("Invalid zoom level: {0} (must be between 0 and 22)")]
    InvalidZoom(u8),

    /// Bounding box encloses no area
    #[error("Degenerate bounding box {0}: zero area")]
    Degenerate(GeoBoundingBox),

    /// A coordinate is NaN or infinite
    #[error("Non-finite coordinate ({0}, {1})")]
    NonFinite(f64, f64),

    /// Boundary has no points to bound
    #[error("Boundary has {0} points")]
    TooFewPoints(usize),

    /// Tile indices do not form a valid range at the zoom level
    #[error("Invalid tile range z{zoom} x{x_min}..={x_max} y{y_min}..={y_max}")]
    InvalidRange {
        zoom: u8,
        x_min: u32,
        x_max: u32,
        y_min: u32,
        y_max: u32,
    },
}

//! Coordinate conversion module
//!
//! Converts geographic bounding boxes into the slippy-map tile ranges that
//! cover them, and tiles back into their geographic corners. All geographic
//! values are WGS84 degrees; the Web Mercator projection happens here.

mod types;

pub use types::{
    Boundary, CoordError, GeoBoundingBox, GeoPoint, TileIndex, TileRange, TileRangeFingerprint,
    TileRangeIter, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM, TILE_SIZE,
};

use std::f64::consts::PI;

/// Fractional tile-space X for a longitude.
#[inline]
fn lon_to_tile_x(lon: f64, n: f64) -> f64 {
    (lon + 180.0) / 360.0 * n
}

/// Fractional tile-space Y for a latitude.
#[inline]
fn lat_to_tile_y(lat: f64, n: f64) -> f64 {
    let lat_rad = lat.to_radians();
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n
}

#[inline]
fn tile_x_to_lon(x: u32, n: f64) -> f64 {
    x as f64 / n * 360.0 - 180.0
}

#[inline]
fn tile_y_to_lat(y: u32, n: f64) -> f64 {
    let y = y as f64 / n;
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}

/// Computes the tile range covering a bounding box at a zoom level.
///
/// The box corners are projected into tile space and snapped outward with
/// `floor` on the low edge and `ceil - 1` on the high edge. A box edge that
/// lies exactly on a tile boundary therefore never pulls in the neighbouring
/// tile. Indices are clamped to `[0, 2^zoom)`.
///
/// # Errors
///
/// Returns a [`CoordError`] if the box is degenerate, non-finite, outside the
/// Web Mercator latitude range or the longitude range, or if the zoom level
/// exceeds [`MAX_ZOOM`].
pub fn tile_range_for(bbox: &GeoBoundingBox, zoom: u8) -> Result<TileRange, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    if !bbox.is_finite() {
        return Err(CoordError::NonFinite(bbox.west(), bbox.south()));
    }
    for lat in [bbox.south(), bbox.north()] {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
    }
    for lon in [bbox.west(), bbox.east()] {
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(CoordError::InvalidLongitude(lon));
        }
    }
    if bbox.is_degenerate() {
        return Err(CoordError::Degenerate(*bbox));
    }

    let n = (1u64 << zoom) as f64;
    let max_index = (1u32 << zoom) - 1;

    let (x_min, x_max) = snap_span(
        lon_to_tile_x(bbox.west(), n),
        lon_to_tile_x(bbox.east(), n),
        max_index,
    );
    // Tile Y grows southward, so north gives the low index
    let (y_min, y_max) = snap_span(
        lat_to_tile_y(bbox.north(), n),
        lat_to_tile_y(bbox.south(), n),
        max_index,
    );

    TileRange::new(zoom, x_min, x_max, y_min, y_max)
}

/// Snaps a fractional `[low, high)` tile span to inclusive integer indices.
fn snap_span(low: f64, high: f64, max_index: u32) -> (u32, u32) {
    let clamp = |v: f64| v.max(0.0).min(max_index as f64) as u32;
    let first = clamp(low.floor());
    let last = clamp(high.ceil() - 1.0);
    // Sub-ulp boxes can round to an empty span
    (first, last.max(first))
}

/// Returns the geographic corners of a tile in the order NW, NE, SE, SW.
///
/// # Errors
///
/// Returns [`CoordError::InvalidZoom`] above [`MAX_ZOOM`] and
/// [`CoordError::InvalidRange`] when the tile lies outside the `2^zoom` grid.
pub fn tile_corners(tile: TileIndex) -> Result<[GeoPoint; 4], CoordError> {
    TileRange::new(tile.zoom, tile.x, tile.x, tile.y, tile.y)?;
    Ok(corners(tile.zoom, tile.x, tile.y))
}

/// Corners of a tile already known to lie inside the grid.
fn corners(zoom: u8, x: u32, y: u32) -> [GeoPoint; 4] {
    let n = (1u64 << zoom) as f64;
    let west = tile_x_to_lon(x, n);
    let east = tile_x_to_lon(x + 1, n);
    let north = tile_y_to_lat(y, n);
    let south = tile_y_to_lat(y + 1, n);

    [
        GeoPoint::new(west, north),
        GeoPoint::new(east, north),
        GeoPoint::new(east, south),
        GeoPoint::new(west, south),
    ]
}

/// Returns the geographic frame of a whole mosaic as a closed ring
/// SW, SE, NE, NW, SW.
///
/// The frame spans the outer edges of the range's corner tiles, which is the
/// union of every tile polygon in the range.
pub fn mosaic_frame(range: &TileRange) -> [GeoPoint; 5] {
    let [nw, _, _, _] = corners(range.zoom(), range.x_min(), range.y_min());
    let [_, _, se, _] = corners(range.zoom(), range.x_max(), range.y_max());

    let sw = GeoPoint::new(nw.lon, se.lat);
    let ne = GeoPoint::new(se.lon, nw.lat);
    [sw, se, ne, nw, sw]
}

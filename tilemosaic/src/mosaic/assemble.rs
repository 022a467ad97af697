//! Mosaic layout.
//!
//! [`MosaicAssembler`] allocates one canvas per tile range and blits every
//! tile at its grid position. Placement depends only on the tile index,
//! never on the order tiles are supplied in.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::{debug, warn};

use super::error::AssemblyError;
use crate::coord::{TileIndex, TileRange, TILE_SIZE};

/// Canvas colour under tiles that were never drawn.
pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Fill for tiles that failed to fetch or decode.
pub const PLACEHOLDER: Rgb<u8> = Rgb([255, 0, 255]);

/// Result of [`MosaicAssembler::assemble`].
#[derive(Debug, Clone)]
pub struct AssembledMosaic {
    pub image: RgbImage,
    /// Tiles painted with the placeholder colour, in row-major order
    pub placeholders: Vec<TileIndex>,
}

impl AssembledMosaic {
    /// True when every tile was drawn from real data.
    pub fn is_complete(&self) -> bool {
        self.placeholders.is_empty()
    }
}

/// Stitches tiles into a single raster.
#[derive(Debug, Clone)]
pub struct MosaicAssembler {
    background: Rgb<u8>,
    placeholder: Option<Rgb<u8>>,
}

impl Default for MosaicAssembler {
    fn default() -> Self {
        Self {
            background: BACKGROUND,
            placeholder: None,
        }
    }
}

impl MosaicAssembler {
    /// Creates an assembler that rejects missing or undecodable tiles.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(mut self, color: Rgb<u8>) -> Self {
        self.background = color;
        self
    }

    /// Paints missing or undecodable tiles with `color` instead of failing.
    pub fn with_placeholder(mut self, color: Rgb<u8>) -> Self {
        self.placeholder = Some(color);
        self
    }

    /// Builds a `(width * 256) x (height * 256)` mosaic of `range`.
    ///
    /// `lookup` is called once per tile in row-major order and returns the
    /// encoded tile bytes, or `None` if the tile is unavailable. Tiles that
    /// are not 256×256 are scaled to fit their cell.
    ///
    /// # Errors
    ///
    /// Without a placeholder, the first missing or undecodable tile fails the
    /// whole assembly.
    pub fn assemble<F>(
        &self,
        range: &TileRange,
        mut lookup: F,
    ) -> Result<AssembledMosaic, AssemblyError>
    where
        F: FnMut(TileIndex) -> Option<Vec<u8>>,
    {
        let mut canvas =
            RgbImage::from_pixel(range.pixel_width(), range.pixel_height(), self.background);
        let mut placeholders = Vec::new();

        for tile in range.tiles() {
            let (x, y) = range.pixel_offset(&tile);

            let decoded = match lookup(tile) {
                Some(bytes) => decode_tile(&bytes).map_err(|reason| AssemblyError::Decode {
                    tile,
                    reason,
                }),
                None => Err(AssemblyError::MissingTile(tile)),
            };

            match (decoded, self.placeholder) {
                (Ok(img), _) => imageops::replace(&mut canvas, &img, x as i64, y as i64),
                (Err(e), Some(color)) => {
                    warn!(tile = %tile, error = %e, "Using placeholder for tile");
                    fill_cell(&mut canvas, x, y, color);
                    placeholders.push(tile);
                }
                (Err(e), None) => return Err(e),
            }
        }

        debug!(
            range = %range,
            width = canvas.width(),
            height = canvas.height(),
            placeholders = placeholders.len(),
            "Mosaic assembled"
        );
        Ok(AssembledMosaic {
            image: canvas,
            placeholders,
        })
    }
}

/// Returns true if `bytes` decode as an image.
pub fn tile_decodes(bytes: &[u8]) -> bool {
    image::load_from_memory(bytes).is_ok()
}

/// Decodes tile bytes into a 256×256 RGB image.
fn decode_tile(bytes: &[u8]) -> Result<RgbImage, String> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| format!("image decode error: {}", e))?
        .to_rgb8();

    if img.width() == TILE_SIZE && img.height() == TILE_SIZE {
        Ok(img)
    } else {
        Ok(imageops::resize(&img, TILE_SIZE, TILE_SIZE, FilterType::Triangle))
    }
}

fn fill_cell(canvas: &mut RgbImage, x_offset: u32, y_offset: u32, color: Rgb<u8>) {
    for y in 0..TILE_SIZE {
        for x in 0..TILE_SIZE {
            canvas.put_pixel(x_offset + x, y_offset + y, color);
        }
    }
}

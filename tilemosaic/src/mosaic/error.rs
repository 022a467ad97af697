use thiserror::Error;

use crate::coord::TileIndex;

/// Errors raised while stitching or encoding a mosaic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    /// Tile bytes could not be decoded and no placeholder is configured
    #[error("Failed to decode tile {tile}: {reason}")]
    Decode { tile: TileIndex, reason: String },

    /// No bytes for a tile and no placeholder is configured
    #[error("Tile {0} is missing")]
    MissingTile(TileIndex),

    #[error("Failed to encode mosaic: {0}")]
    Encode(String),

    /// Data passed for comment insertion is not a JPEG stream
    #[error("Not a JPEG stream: {0}")]
    NotJpeg(String),

    /// COM segments hold at most 65533 bytes
    #[error("Comment too long: {0} bytes (max 65533)")]
    CommentTooLong(usize),
}

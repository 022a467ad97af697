//! Mosaic assembly and encoding.
//!
//! Tiles are laid out on one canvas per tile range, then the canvas is
//! encoded as JPEG with a comment that identifies the service and tile range
//! it was built from. That comment is what later cache validation reads.

mod assemble;
mod comment;
mod error;

pub use assemble::{tile_decodes, AssembledMosaic, MosaicAssembler, BACKGROUND, PLACEHOLDER};
pub use comment::{
    encode_jpeg_with_comment, insert_jpeg_comment, read_jpeg_comment, MAX_COMMENT_LEN,
};
pub use error::AssemblyError;

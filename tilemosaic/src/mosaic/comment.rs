//! JPEG comment (COM segment) embedding.
//!
//! A JPEG stream is a sequence of marker segments:
//!
//! ```text
//! FF D8                      SOI
//! FF E0 <len:u16> ...        APP0 (JFIF), optional
//! FF FE <len:u16> <text>     COM
//! ...
//! FF DA <len:u16> ...        SOS, followed by entropy-coded data
//! ```
//!
//! `len` is big-endian and counts itself, so a comment of `n` bytes has
//! `len = n + 2`.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use super::error::AssemblyError;

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const COM: u8 = 0xFE;
const TEM: u8 = 0x01;

/// Largest comment a single COM segment can carry.
pub const MAX_COMMENT_LEN: usize = u16::MAX as usize - 2;

/// Encodes `image` as JPEG and embeds `comment` in a COM segment.
pub fn encode_jpeg_with_comment(
    image: &RgbImage,
    quality: u8,
    comment: &str,
) -> Result<Vec<u8>, AssemblyError> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|e| AssemblyError::Encode(e.to_string()))?;
    insert_jpeg_comment(&buf.into_inner(), comment)
}

/// Inserts a COM segment right after SOI, or after the APP0 segment when
/// the stream starts with one.
pub fn insert_jpeg_comment(jpeg: &[u8], comment: &str) -> Result<Vec<u8>, AssemblyError> {
    if comment.len() > MAX_COMMENT_LEN {
        return Err(AssemblyError::CommentTooLong(comment.len()));
    }
    if jpeg.len() < 4 || jpeg[0] != MARKER || jpeg[1] != SOI {
        return Err(AssemblyError::NotJpeg("missing SOI marker".to_string()));
    }

    let mut insert_at = 2;
    if jpeg[2] == MARKER && jpeg[3] == APP0 {
        let len = segment_len(jpeg, 4)
            .ok_or_else(|| AssemblyError::NotJpeg("truncated APP0 segment".to_string()))?;
        insert_at = 4 + len;
        if insert_at > jpeg.len() {
            return Err(AssemblyError::NotJpeg("truncated APP0 segment".to_string()));
        }
    }

    let mut out = Vec::with_capacity(jpeg.len() + comment.len() + 4);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[MARKER, COM]);
    out.extend_from_slice(&((comment.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(comment.as_bytes());
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}

/// Returns the text of the first COM segment before the image data.
///
/// Returns `None` for non-JPEG input, truncated headers, or when no comment
/// precedes SOS.
pub fn read_jpeg_comment(jpeg: &[u8]) -> Option<String> {
    if jpeg.len() < 2 || jpeg[0] != MARKER || jpeg[1] != SOI {
        return None;
    }

    let mut pos = 2;
    loop {
        if *jpeg.get(pos)? != MARKER {
            return None;
        }
        // Fill bytes may pad before a marker
        while *jpeg.get(pos)? == MARKER {
            pos += 1;
        }
        let marker = jpeg[pos];
        pos += 1;

        match marker {
            EOI | SOS => return None,
            TEM | 0xD0..=0xD7 => continue,
            _ => {}
        }

        let len = segment_len(jpeg, pos)?;
        let end = pos + len;
        if end > jpeg.len() {
            return None;
        }
        if marker == COM {
            return Some(String::from_utf8_lossy(&jpeg[pos + 2..end]).into_owned());
        }
        pos = end;
    }
}

/// Reads the big-endian length field at `pos`; always at least 2.
fn segment_len(jpeg: &[u8], pos: usize) -> Option<usize> {
    let hi = *jpeg.get(pos)? as usize;
    let lo = *jpeg.get(pos + 1)? as usize;
    let len = (hi << 8) | lo;
    (len >= 2).then_some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn small_image() -> RgbImage {
        RgbImage::from_pixel(32, 16, Rgb([200, 10, 10]))
    }

    #[test]
    fn test_encoded_mosaic_carries_comment() {
        let comment = "OpenStreetMap@14_1_2_3_4";
        let data = encode_jpeg_with_comment(&small_image(), 90, comment).unwrap();

        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        assert_eq!(read_jpeg_comment(&data).as_deref(), Some(comment));
    }

    #[test]
    fn test_encoded_mosaic_still_decodes() {
        let data = encode_jpeg_with_comment(&small_image(), 90, "note").unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
        assert_eq!(
            image::guess_format(&data).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_comment_follows_app0() {
        // SOI, APP0 of length 4, then EOI
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, 0xFF, 0xD9];
        let out = insert_jpeg_comment(&jpeg, "hi").unwrap();

        assert_eq!(
            out,
            vec![
                0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, 0xFF, 0xFE, 0x00, 0x04, b'h', b'i',
                0xFF, 0xD9
            ]
        );
    }

    #[test]
    fn test_comment_after_soi_without_app0() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x02, 0xFF, 0xD9];
        let out = insert_jpeg_comment(&jpeg, "x").unwrap();
        assert_eq!(&out[..7], &[0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x03, b'x']);
        assert_eq!(read_jpeg_comment(&out).as_deref(), Some("x"));
    }

    #[test]
    fn test_empty_comment_allowed() {
        let data = encode_jpeg_with_comment(&small_image(), 50, "").unwrap();
        assert_eq!(read_jpeg_comment(&data).as_deref(), Some(""));
    }

    #[test]
    fn test_no_comment_found() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x02, 0xFF, 0xDA, 0x00, 0x02];
        assert_eq!(read_jpeg_comment(&jpeg), None);
    }

    #[test]
    fn test_reader_rejects_non_jpeg() {
        assert_eq!(read_jpeg_comment(b"\x89PNG\r\n\x1a\n"), None);
        assert_eq!(read_jpeg_comment(&[]), None);
        assert!(matches!(
            insert_jpeg_comment(b"\x89PNG\r\n\x1a\n", "c"),
            Err(AssemblyError::NotJpeg(_))
        ));
    }

    #[test]
    fn test_reader_survives_truncation() {
        let data = encode_jpeg_with_comment(&small_image(), 90, "abc").unwrap();
        for cut in 0..24 {
            // Must not panic on any prefix
            let _ = read_jpeg_comment(&data[..cut]);
        }
    }

    #[test]
    fn test_reader_skips_fill_bytes() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xFF, 0xFE, 0x00, 0x03, b'z', 0xFF, 0xD9];
        assert_eq!(read_jpeg_comment(&jpeg).as_deref(), Some("z"));
    }

    #[test]
    fn test_comment_too_long() {
        let comment = "a".repeat(MAX_COMMENT_LEN + 1);
        assert!(matches!(
            encode_jpeg_with_comment(&small_image(), 90, &comment),
            Err(AssemblyError::CommentTooLong(_))
        ));
    }
}

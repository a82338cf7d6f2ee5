//! Shared test utilities: synthetic JPEGs with the metadata shapes cameras
//! actually write.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! // 640x480 photo shot in portrait, with a 160x120 EXIF thumbnail
//! let jpeg = with_exif(&encode_jpeg(640, 480), &ExifSpec {
//!     orientation: Some(6),
//!     thumbnail: Some(encode_jpeg(160, 120)),
//!     ..Default::default()
//! });
//!
//! // Same photo with a 320x240 MPF preview appended
//! let jpeg = with_mpf_preview(&jpeg, &encode_jpeg(320, 240));
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::Path;

// =========================================================================
// Plain JPEG streams
// =========================================================================

/// Encode a gradient test image as JPEG.
pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Write a gradient JPEG to disk, creating parent directories.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, encode_jpeg(width, height)).unwrap();
}

// =========================================================================
// EXIF (APP1)
// =========================================================================

/// Fields to place in a synthetic EXIF block.
#[derive(Debug, Clone, Default)]
pub struct ExifSpec {
    pub orientation: Option<u16>,
    /// JPEG stream stored in IFD1.
    pub thumbnail: Option<Vec<u8>>,
    /// IFD0 `DateTime`, e.g. `"2021:07:14 18:30:05"`.
    pub date_time: Option<String>,
    /// IFD0 `ImageDescription`.
    pub description: Option<String>,
}

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

fn ascii(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

/// Insert a big-endian EXIF APP1 segment right after the SOI marker.
pub fn with_exif(jpeg: &[u8], spec: &ExifSpec) -> Vec<u8> {
    // (tag, type, count, value bytes), sorted by tag as TIFF requires
    let mut entries: Vec<(u16, u16, u32, Vec<u8>)> = Vec::new();
    if let Some(text) = &spec.description {
        let bytes = ascii(text);
        entries.push((0x010E, TYPE_ASCII, bytes.len() as u32, bytes));
    }
    let orientation = match (spec.orientation, entries.is_empty() && spec.date_time.is_none()) {
        (Some(value), _) => Some(value),
        // Keep IFD0 non-empty
        (None, true) => Some(1),
        (None, false) => None,
    };
    if let Some(value) = orientation {
        entries.push((0x0112, TYPE_SHORT, 1, value.to_be_bytes().to_vec()));
    }
    if let Some(text) = &spec.date_time {
        let bytes = ascii(text);
        entries.push((0x0132, TYPE_ASCII, bytes.len() as u32, bytes));
    }

    let ifd0_offset = 8usize;
    let data_start = ifd0_offset + 2 + 12 * entries.len() + 4;

    let mut ifd = Vec::new();
    let mut data = Vec::new();
    ifd.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for (tag, typ, count, bytes) in &entries {
        ifd.extend_from_slice(&tag.to_be_bytes());
        ifd.extend_from_slice(&typ.to_be_bytes());
        ifd.extend_from_slice(&count.to_be_bytes());
        if bytes.len() <= 4 {
            let mut inline = bytes.clone();
            inline.resize(4, 0);
            ifd.extend_from_slice(&inline);
        } else {
            ifd.extend_from_slice(&((data_start + data.len()) as u32).to_be_bytes());
            data.extend_from_slice(bytes);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }

    let ifd1_offset = data_start + data.len();
    let next_ifd = if spec.thumbnail.is_some() {
        ifd1_offset as u32
    } else {
        0
    };

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2A");
    tiff.extend_from_slice(&(ifd0_offset as u32).to_be_bytes());
    tiff.extend_from_slice(&ifd);
    tiff.extend_from_slice(&next_ifd.to_be_bytes());
    tiff.extend_from_slice(&data);

    if let Some(thumb) = &spec.thumbnail {
        let thumb_offset = (ifd1_offset + 2 + 2 * 12 + 4) as u32;
        tiff.extend_from_slice(&2u16.to_be_bytes());
        tiff.extend_from_slice(&0x0201u16.to_be_bytes());
        tiff.extend_from_slice(&TYPE_LONG.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&thumb_offset.to_be_bytes());
        tiff.extend_from_slice(&0x0202u16.to_be_bytes());
        tiff.extend_from_slice(&TYPE_LONG.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&(thumb.len() as u32).to_be_bytes());
        tiff.extend_from_slice(&0u32.to_be_bytes());
        tiff.extend_from_slice(thumb);
    }

    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    segment.extend_from_slice(b"Exif\x00\x00");
    segment.extend_from_slice(&tiff);

    splice_after_soi(jpeg, &segment)
}

// =========================================================================
// MPF (APP2)
// =========================================================================

/// Build `primary` with an MPF index and `preview` appended as its
/// "Large Thumbnail" sub-image.
///
/// Layout: SOI, APP2 (`MPF\0` + 70-byte big-endian payload), rest of the
/// primary stream, preview stream. The payload starts at file offset 10.
pub fn with_mpf_preview(primary: &[u8], preview: &[u8]) -> Vec<u8> {
    const PAYLOAD_START: usize = 10;
    const PAYLOAD_LEN: usize = 70;
    const SEGMENT_LEN: usize = 2 + 2 + 4 + PAYLOAD_LEN;

    let primary_len = primary.len() + SEGMENT_LEN;

    let mut payload = Vec::with_capacity(PAYLOAD_LEN);
    payload.extend_from_slice(b"MM\x00\x2A");
    payload.extend_from_slice(&8u32.to_be_bytes());
    payload.extend_from_slice(&2u16.to_be_bytes());
    // 0xB001 NumberOfImages = 2
    payload.extend_from_slice(&0xB001u16.to_be_bytes());
    payload.extend_from_slice(&TYPE_LONG.to_be_bytes());
    payload.extend_from_slice(&1u32.to_be_bytes());
    payload.extend_from_slice(&2u32.to_be_bytes());
    // 0xB002 MPEntry, 32 bytes at 38
    payload.extend_from_slice(&0xB002u16.to_be_bytes());
    payload.extend_from_slice(&7u16.to_be_bytes());
    payload.extend_from_slice(&32u32.to_be_bytes());
    payload.extend_from_slice(&38u32.to_be_bytes());
    payload.extend_from_slice(&0u32.to_be_bytes());
    // Primary image
    payload.extend_from_slice(&0x2003_0000u32.to_be_bytes());
    payload.extend_from_slice(&(primary_len as u32).to_be_bytes());
    payload.extend_from_slice(&0u32.to_be_bytes());
    payload.extend_from_slice(&[0, 0, 0, 0]);
    // Large thumbnail
    payload.extend_from_slice(&0x0001_0002u32.to_be_bytes());
    payload.extend_from_slice(&(preview.len() as u32).to_be_bytes());
    payload.extend_from_slice(&((primary_len - PAYLOAD_START) as u32).to_be_bytes());
    payload.extend_from_slice(&[0, 0, 0, 0]);
    assert_eq!(payload.len(), PAYLOAD_LEN);

    let mut segment = vec![0xFF, 0xE2];
    segment.extend_from_slice(&((SEGMENT_LEN - 2) as u16).to_be_bytes());
    segment.extend_from_slice(b"MPF\x00");
    segment.extend_from_slice(&payload);

    let mut out = splice_after_soi(primary, &segment);
    assert_eq!(out.len(), primary_len);
    out.extend_from_slice(preview);
    out
}

fn splice_after_soi(jpeg: &[u8], segment: &[u8]) -> Vec<u8> {
    assert!(jpeg.starts_with(&[0xFF, 0xD8]), "not a JPEG stream");
    let mut out = Vec::with_capacity(jpeg.len() + segment.len());
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(segment);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// =========================================================================
// Filesystem
// =========================================================================

/// Set a file's mtime to `secs` after the Unix epoch.
pub fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(secs, 0)).unwrap();
}

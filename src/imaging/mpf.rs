//! Minimal Multi-Picture Format (MPF) reader for JPEG files.
//!
//! Cameras that shoot JPEG often append a second, smaller JPEG stream after
//! the primary image (a "Large Thumbnail", typically 1920 px wide) and index
//! it from an APP2 segment tagged `MPF\0`. Decoding that preview is much
//! cheaper than decoding a 24+ MP primary image.
//!
//! The APP2 payload is a TIFF-style structure:
//!
//! ```text
//! "MM\0\x2A" | "II\x2A\0"   byte order + magic
//! u32                       offset of the MP Index IFD
//! IFD: u16 count, 12-byte entries
//!   0xB001  number of images (inline value)
//!   0xB002  offset of the MP Entry table
//! MP Entry (16 bytes each):
//!   u32 attribute   flags:5 | format:3 | type:24
//!   u32 size
//!   u32 offset      relative to the payload start, 0 for the primary image
//!   u16 u16         dependent image entries (ignored)
//! ```
//!
//! Every parse failure yields an empty list. A malformed MPF segment only
//! means "no preview available".

/// Image type code of the MPF "Large Thumbnail" sub-image.
pub const LARGE_THUMBNAIL: u32 = 0x010002;

const MPF_IDENTIFIER: &[u8] = b"MPF\0";
const TAG_NUMBER_OF_IMAGES: u16 = 0xB001;
const TAG_MP_ENTRY: u16 = 0xB002;
const MP_ENTRY_SIZE: usize = 16;

/// One sub-image described by an MP Entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpfImage {
    /// Top five bits of the attribute (dependent parent/child, representative).
    pub flags: u8,
    /// Image data format, `0` = JPEG.
    pub format: u8,
    /// Low 24 bits of the attribute, e.g. [`LARGE_THUMBNAIL`].
    pub type_code: u32,
    /// Offset as stored: relative to the MPF payload, `0` for the primary image.
    pub byte_offset: u32,
    pub byte_length: u32,
}

impl MpfImage {
    fn from_attribute(attribute: u32, byte_length: u32, byte_offset: u32) -> Self {
        Self {
            flags: (attribute >> 27) as u8,
            format: ((attribute >> 24) & 0x7) as u8,
            type_code: attribute & 0x00FF_FFFF,
            byte_offset,
            byte_length,
        }
    }

    /// Offset of this sub-image from the start of the JPEG file.
    ///
    /// `payload_start` is the absolute position of the byte-order mark that
    /// opens the MPF payload.
    pub fn absolute_offset(&self, payload_start: usize) -> usize {
        if self.byte_offset == 0 {
            0
        } else {
            payload_start + self.byte_offset as usize
        }
    }
}

/// Find the MPF payload (the bytes after `MPF\0`) in a JPEG stream.
///
/// Returns the payload together with its absolute offset in `jpeg`.
/// Scanning stops at the first SOS marker since metadata never follows it.
pub fn find_mpf_payload(jpeg: &[u8]) -> Option<(usize, &[u8])> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = jpeg[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // SOS: entropy-coded data follows
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        // Markers without a length field
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let seg_len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > jpeg.len() {
            return None;
        }
        let segment = &jpeg[pos + 4..pos + 2 + seg_len];
        if marker == 0xE2 && segment.starts_with(MPF_IDENTIFIER) {
            let payload_start = pos + 4 + MPF_IDENTIFIER.len();
            return Some((payload_start, &segment[MPF_IDENTIFIER.len()..]));
        }
        pos += 2 + seg_len;
    }
    None
}

/// Decode the MP Entry table of an MPF payload.
///
/// Returns an empty list on any structural problem: unknown byte order, bad
/// magic, an IFD or entry table that runs past the payload, or a missing
/// entry table.
pub fn parse_mpf(payload: &[u8]) -> Vec<MpfImage> {
    if payload.len() < 8 {
        return Vec::new();
    }

    let big_endian = match &payload[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return Vec::new(),
    };

    let read_u16 = |offset: usize| -> Option<u16> {
        let bytes: [u8; 2] = payload.get(offset..offset + 2)?.try_into().ok()?;
        Some(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };

    let read_u32 = |offset: usize| -> Option<u32> {
        let bytes: [u8; 4] = payload.get(offset..offset + 4)?.try_into().ok()?;
        Some(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    };

    parse_index_ifd(read_u16, read_u32).unwrap_or_default()
}

fn parse_index_ifd(
    read_u16: impl Fn(usize) -> Option<u16>,
    read_u32: impl Fn(usize) -> Option<u32>,
) -> Option<Vec<MpfImage>> {
    if read_u16(2)? != 42 {
        return None;
    }

    let ifd_offset = read_u32(4)? as usize;
    let entry_count = read_u16(ifd_offset)? as usize;

    let mut image_count = None;
    let mut table_offset = None;

    for i in 0..entry_count {
        let entry = ifd_offset + 2 + i * 12;
        let tag = read_u16(entry)?;
        let value = read_u32(entry + 8)?;
        match tag {
            TAG_NUMBER_OF_IMAGES => image_count = Some(value as usize),
            TAG_MP_ENTRY => table_offset = Some(value as usize),
            _ => {}
        }
    }

    let table_offset = table_offset?;
    let image_count = image_count?;

    let mut images = Vec::with_capacity(image_count.min(16));
    for i in 0..image_count {
        let record = table_offset + i * MP_ENTRY_SIZE;
        let attribute = read_u32(record)?;
        let byte_length = read_u32(record + 4)?;
        let byte_offset = read_u32(record + 8)?;
        // Dependent image entries must be present even though they are unused
        read_u16(record + 14)?;
        images.push(MpfImage::from_attribute(attribute, byte_length, byte_offset));
    }
    Some(images)
}

/// Return the embedded "Large Thumbnail" JPEG stream, if the file has one.
///
/// The slice must lie entirely inside `jpeg` and begin with a JPEG SOI
/// followed by another marker (`FF D8 FF`).
pub fn large_thumbnail(jpeg: &[u8]) -> Option<&[u8]> {
    let (payload_start, payload) = find_mpf_payload(jpeg)?;
    parse_mpf(payload)
        .into_iter()
        .filter(|image| image.type_code == LARGE_THUMBNAIL && image.byte_offset != 0)
        .find_map(|image| {
            let start = image.absolute_offset(payload_start);
            let end = start.checked_add(image.byte_length as usize)?;
            let bytes = jpeg.get(start..end)?;
            bytes.starts_with(&[0xFF, 0xD8, 0xFF]).then_some(bytes)
        })
}

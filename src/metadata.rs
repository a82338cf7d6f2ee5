//! Embedded metadata of a media file.
//!
//! Everything the rendition pipeline needs to know before it touches pixels
//! is read here, once per file, from the EXIF block and the MPF index:
//!
//! - **Orientation**: EXIF `Orientation` (`0x0112`) in IFD0.
//! - **Capture date**: the first parseable of `DateTimeOriginal`,
//!   `DateTimeDigitized`, `DateTime`.
//! - **Embedded thumbnail**: the JPEG stored in IFD1
//!   (`JPEGInterchangeFormat` / `JPEGInterchangeFormatLength`), with its
//!   pixel size probed from its own frame header.
//! - **Preview size**: the pixel size of the MPF "Large Thumbnail" stream.
//! - **Text fields**: every ASCII field of IFD0 and the EXIF sub-IFD keyed by
//!   tag name, plus the Windows `XPKeywords` field. These back the
//!   configurable tags field.
//!
//! Missing or corrupt metadata is never an error: every field falls back to
//! "absent" and the pipeline decodes the full image instead.

use crate::imaging::{Orientation, mpf};
use chrono::NaiveDateTime;
use exif::{Context, Exif, In, Reader, Tag, Value};
use image::ImageReader;
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{debug, trace};

/// EXIF tags to try for the capture date, in priority order.
const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Windows Explorer's keyword field, UTF-16LE in a BYTE array.
const XP_KEYWORDS: Tag = Tag(Context::Tiff, 0x9C9E);

/// The JPEG stored in EXIF IFD1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedThumbnail {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub orientation: Orientation,
    pub capture_date: Option<NaiveDateTime>,
    pub thumbnail: Option<EmbeddedThumbnail>,
    pub preview_size: Option<(u32, u32)>,
    pub text_fields: BTreeMap<String, String>,
}

impl MediaMetadata {
    /// Read metadata from an in-memory JPEG.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut meta = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => Self::from_exif(&exif),
            Err(e) => {
                trace!(error = %e, "no usable EXIF block");
                Self::default()
            }
        };
        meta.preview_size = mpf::large_thumbnail(bytes).and_then(probe_dimensions);
        meta
    }

    fn from_exif(exif: &Exif) -> Self {
        let orientation = exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from_exif)
            .unwrap_or_default();

        let capture_date = DATE_TAGS.iter().find_map(|tag| {
            let field = exif.get_field(*tag, In::PRIMARY)?;
            parse_exif_datetime(&ascii_value(&field.value)?)
        });

        let thumbnail = read_thumbnail(exif);

        let mut text_fields = BTreeMap::new();
        for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
            if field.tag == XP_KEYWORDS {
                if let Value::Byte(ref raw) = field.value {
                    text_fields.insert("XPKeywords".to_string(), decode_utf16le(raw));
                }
            } else if let Some(text) = ascii_value(&field.value) {
                text_fields.insert(field.tag.to_string(), text);
            }
        }

        Self {
            orientation,
            capture_date,
            thumbnail,
            preview_size: None,
            text_fields,
        }
    }

    /// Value of a text field by EXIF tag name, e.g. `"ImageDescription"`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.text_fields
            .get(name)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Split a text field into tags.
    ///
    /// Separators are `,` and `;`. Whitespace around each tag is trimmed and
    /// empty pieces are dropped; order is preserved.
    pub fn tags(&self, field: &str) -> Vec<String> {
        self.field(field).map(split_tags).unwrap_or_default()
    }
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn read_thumbnail(exif: &Exif) -> Option<EmbeddedThumbnail> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;

    // Offsets are relative to the TIFF header, which is what buf() holds
    let bytes = exif.buf().get(offset..offset.checked_add(length)?)?;
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        debug!(offset, length, "EXIF thumbnail is not a JPEG stream");
        return None;
    }
    let (width, height) = probe_dimensions(bytes)?;
    Some(EmbeddedThumbnail {
        bytes: bytes.to_vec(),
        width,
        height,
    })
}

fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
        .filter(|&(w, h)| w > 0 && h > 0)
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(lines) => {
            let text = lines
                .iter()
                .map(|line| String::from_utf8_lossy(line).trim_end_matches('\0').to_string())
                .collect::<Vec<_>>()
                .join(" ");
            Some(text.trim().to_string()).filter(|s| !s.is_empty())
        }
        _ => None,
    }
}

fn decode_utf16le(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');
    ["%Y:%m:%d %H:%M:%S", "%Y:%m:%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

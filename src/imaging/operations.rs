//! High-level image operations.
//!
//! These functions combine calculations with backend execution:
//! [`select_source`] picks the cheapest pixel source that is large enough for
//! a request and applies EXIF orientation, [`render_rendition`] turns that
//! source into encoded JPEG bytes.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{
    Orientation, Region, center_crop_to_ratio, center_square, covers, fit_dimensions,
};
use super::mpf;
use super::params::{Quality, RenditionRequest};
use crate::metadata::MediaMetadata;
use image::DynamicImage;
use tracing::{debug, trace};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Where the pixels of a [`SourceImage`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    ExifThumbnail,
    MpfPreview,
    Original,
}

/// Decoded, upright pixels ready for resampling.
pub struct SourceImage<'a> {
    pub image: DynamicImage,
    pub kind: SourceKind,
    /// The exact encoded stream `image` was decoded from, when no crop or
    /// rotation has been applied since. Lets an unchanged-size rendition be
    /// written without re-encoding.
    pub verbatim: Option<&'a [u8]>,
}

impl SourceImage<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Pick the pixel source for a rendition of `target` size.
///
/// Priority:
/// 1. the EXIF thumbnail, trimmed to the original's aspect ratio, when its
///    upright size covers `target`;
/// 2. the MPF "Large Thumbnail" when its upright size covers `target`;
/// 3. the full original.
///
/// A candidate that fails to decode is skipped. Orientation is applied to
/// whichever source wins.
pub fn select_source<'a>(
    backend: &impl ImageBackend,
    original: &'a [u8],
    meta: &'a MediaMetadata,
    target: (u32, u32),
) -> Result<SourceImage<'a>> {
    let orientation = meta.orientation;

    let selected = exif_thumbnail_source(backend, original, meta, target)
        .or_else(|| mpf_preview_source(backend, original, meta, target));

    let source = match selected {
        Some(source) => source,
        None => SourceImage {
            image: backend.decode(original)?,
            kind: SourceKind::Original,
            verbatim: Some(original),
        },
    };
    trace!(kind = ?source.kind, ?orientation, "selected rendition source");

    Ok(apply_orientation(source, orientation))
}

fn exif_thumbnail_source<'a>(
    backend: &impl ImageBackend,
    original: &[u8],
    meta: &'a MediaMetadata,
    target: (u32, u32),
) -> Option<SourceImage<'a>> {
    let thumb = meta.thumbnail.as_ref()?;
    let original_size = backend.dimensions(original).ok()?.as_tuple();
    let region = center_crop_to_ratio((thumb.width, thumb.height), original_size);

    if !covers(meta.orientation.apply(region.size()), target) {
        return None;
    }

    let image = match backend.decode(&thumb.bytes) {
        Ok(image) => image,
        Err(e) => {
            debug!(error = %e, "embedded EXIF thumbnail failed to decode");
            return None;
        }
    };

    let full = Region::full(image.width(), image.height());
    if region == full {
        Some(SourceImage {
            image,
            kind: SourceKind::ExifThumbnail,
            verbatim: Some(&thumb.bytes),
        })
    } else {
        Some(SourceImage {
            image: image.crop_imm(region.x, region.y, region.width, region.height),
            kind: SourceKind::ExifThumbnail,
            verbatim: None,
        })
    }
}

fn mpf_preview_source<'a>(
    backend: &impl ImageBackend,
    original: &'a [u8],
    meta: &MediaMetadata,
    target: (u32, u32),
) -> Option<SourceImage<'a>> {
    let size = meta.preview_size?;
    if !covers(meta.orientation.apply(size), target) {
        return None;
    }
    let bytes = mpf::large_thumbnail(original)?;
    match backend.decode(bytes) {
        Ok(image) => Some(SourceImage {
            image,
            kind: SourceKind::MpfPreview,
            verbatim: Some(bytes),
        }),
        Err(e) => {
            debug!(error = %e, "MPF preview failed to decode");
            None
        }
    }
}

/// Turn stored pixels upright. Any rotation invalidates the verbatim bytes.
fn apply_orientation(source: SourceImage<'_>, orientation: Orientation) -> SourceImage<'_> {
    let image = match orientation {
        Orientation::Normal => return source,
        Orientation::Rotate180 => source.image.rotate180(),
        Orientation::Rotate90 => source.image.rotate90(),
        Orientation::Rotate270 => source.image.rotate270(),
    };
    SourceImage {
        image,
        kind: source.kind,
        verbatim: None,
    }
}

/// Produce the encoded JPEG for `request` from an upright source.
///
/// - crop: centered square of side `min(w, h)`, resampled to exactly the box;
/// - fit: proportional size inside the box; when that equals the source size
///   and the source bytes are still verbatim, they are returned unchanged.
pub fn render_rendition(
    backend: &impl ImageBackend,
    source: &SourceImage<'_>,
    request: RenditionRequest,
    quality: Quality,
) -> Result<Vec<u8>> {
    let (width, height) = source.dimensions();

    if request.crop {
        let square = center_square(width, height);
        let cropped = source
            .image
            .crop_imm(square.x, square.y, square.width, square.height);
        let resized = backend.resample(&cropped, request.width, request.height)?;
        return backend.encode_jpeg(&resized, quality);
    }

    let (fit_w, fit_h) = fit_dimensions((width, height), (request.width, request.height));
    if fit_w == 0 || fit_h == 0 {
        return Err(BackendError::EmptyImage {
            width: fit_w,
            height: fit_h,
        });
    }

    if (fit_w, fit_h) == (width, height) {
        if let Some(bytes) = source.verbatim {
            trace!(width, height, "rendition matches source, reusing bytes");
            return Ok(bytes.to_vec());
        }
        return backend.encode_jpeg(&source.image, quality);
    }

    let resized = backend.resample(&source.image, fit_w, fit_h)?;
    backend.encode_jpeg(&resized, quality)
}

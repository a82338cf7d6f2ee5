//! Pure calculation functions for rendition geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// A rectangular region inside an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Fit a source inside a target box while keeping its aspect ratio.
///
/// With `ratio = src_w / src_h`: if the box is wider than the source, the
/// height is kept and the width becomes `floor(box_h * ratio)`; otherwise the
/// width is kept and the height becomes `floor(box_w / ratio)`. The result is
/// not clamped to the source size, so a box larger than the source scales up.
///
/// # Examples
/// ```
/// # use pellicule::imaging::fit_dimensions;
/// // 800x600 into 50x50 → 50x37
/// assert_eq!(fit_dimensions((800, 600), (50, 50)), (50, 37));
/// ```
pub fn fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    if src_w == 0 || src_h == 0 || tgt_h == 0 {
        return (0, 0);
    }

    let ratio = src_w as f64 / src_h as f64;
    let box_ratio = tgt_w as f64 / tgt_h as f64;

    if box_ratio > ratio {
        ((tgt_h as f64 * ratio).floor() as u32, tgt_h)
    } else {
        (tgt_w, (tgt_w as f64 / ratio).floor() as u32)
    }
}

/// Centered square of side `min(width, height)`.
pub fn center_square(width: u32, height: u32) -> Region {
    let side = width.min(height);
    Region {
        x: (width - side) / 2,
        y: (height - side) / 2,
        width: side,
        height: side,
    }
}

/// Centered region of `thumb` matching the aspect ratio of `original`.
///
/// Camera thumbnails are often letterboxed to a fixed 4:3 or 16:9 frame; this
/// trims the bars so the thumbnail has the same shape as the primary image.
/// Returns the full thumbnail when the ratios already agree.
pub fn center_crop_to_ratio(thumb: (u32, u32), original: (u32, u32)) -> Region {
    let (tw, th) = thumb;
    let (ow, oh) = original;
    if tw == 0 || th == 0 || ow == 0 || oh == 0 {
        return Region::full(tw, th);
    }

    // Compare th/tw with oh/ow without floating point
    let thumb_cross = th as u64 * ow as u64;
    let orig_cross = oh as u64 * tw as u64;

    if thumb_cross == orig_cross {
        Region::full(tw, th)
    } else if thumb_cross > orig_cross {
        // Thumbnail is taller than the original: trim top and bottom
        let height = ((tw as f64 * oh as f64 / ow as f64).round() as u32).clamp(1, th);
        Region {
            x: 0,
            y: (th - height) / 2,
            width: tw,
            height,
        }
    } else {
        // Thumbnail is wider than the original: trim the sides
        let width = ((th as f64 * ow as f64 / oh as f64).round() as u32).clamp(1, tw);
        Region {
            x: (tw - width) / 2,
            y: 0,
            width,
            height: th,
        }
    }
}

/// Whether an image of `size` is at least as large as `target` in both axes.
pub fn covers(size: (u32, u32), target: (u32, u32)) -> bool {
    size.0 >= target.0 && size.1 >= target.1
}

/// EXIF orientation, reduced to the rotations a camera actually writes.
///
/// Mirrored orientations (2, 4, 5, 7) are treated as upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal,
    /// EXIF 3
    Rotate180,
    /// EXIF 6: the stored image must be turned 90° clockwise to display.
    Rotate90,
    /// EXIF 8: the stored image must be turned 270° clockwise to display.
    Rotate270,
}

impl Orientation {
    pub fn from_exif(value: u32) -> Self {
        match value {
            3 => Orientation::Rotate180,
            6 => Orientation::Rotate90,
            8 => Orientation::Rotate270,
            _ => Orientation::Normal,
        }
    }

    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Orientation::Rotate90 | Orientation::Rotate270)
    }

    /// Displayed `(width, height)` of a stored image of `size`.
    pub fn apply(self, size: (u32, u32)) -> (u32, u32) {
        if self.swaps_dimensions() {
            (size.1, size.0)
        } else {
            size
        }
    }
}

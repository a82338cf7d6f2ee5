//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They sit between the
//! [`cache`](crate::cache) (which decides whether a rendition must be built)
//! and the [`operations`](super::operations) module (which does the work
//! through an [`ImageBackend`](super::ImageBackend)).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 95). Clamped on construction.
//! - [`RenditionRequest`]: target box plus crop flag; the cache key of a rendition.

use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// A requested rendition: a target box and whether to crop-to-fill it.
///
/// Two requests share a cache entry only if all three fields are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenditionRequest {
    pub width: u32,
    pub height: u32,
    /// `true` = center square crop resampled to exactly `(width, height)`.
    /// `false` = proportional fit inside the box.
    pub crop: bool,
}

impl RenditionRequest {
    pub fn new(width: u32, height: u32, crop: bool) -> Self {
        Self {
            width,
            height,
            crop,
        }
    }

    /// Cache file name prefix, `w=<w>,h=<h>[,c]`.
    pub fn cache_key(&self) -> String {
        if self.crop {
            format!("w={},h={},c", self.width, self.height)
        } else {
            format!("w={},h={}", self.width, self.height)
        }
    }
}

impl fmt::Display for RenditionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.crop {
            write!(f, " crop")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_95() {
        assert_eq!(Quality::default().value(), 95);
    }

    #[test]
    fn cache_key_marks_crop() {
        assert_eq!(RenditionRequest::new(100, 100, true).cache_key(), "w=100,h=100,c");
        assert_eq!(RenditionRequest::new(150, 100, false).cache_key(), "w=150,h=100");
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(RenditionRequest::new(250, 250, false).to_string(), "250x250");
        assert_eq!(RenditionRequest::new(80, 80, true).to_string(), "80x80 crop");
    }
}

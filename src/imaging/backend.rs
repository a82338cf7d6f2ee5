//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four pixel primitives the rendition
//! pipeline needs: probe dimensions, decode, resample and encode. Geometry
//! (crop regions, fit sizes, orientation) is decided in
//! [`calculations`](super::calculations) and applied in
//! [`operations`](super::operations), so a backend never makes a choice.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image` crate.

use super::params::Quality;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Result of a dimension probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// All operations work on in-memory buffers. Reading sources and writing
/// cache files is the caller's job.
pub trait ImageBackend {
    /// Read the pixel size from the stream header without decoding pixels.
    fn dimensions(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode an encoded image (JPEG) into a pixel buffer.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Resample to exactly `width` x `height`, ignoring aspect ratio.
    fn resample(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError>;

    /// Encode as baseline JPEG.
    fn encode_jpeg(&self, image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError>;
}

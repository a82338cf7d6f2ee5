//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Dimensions | `image::ImageReader::into_dimensions` (header only) |
//! | Decode | `image::ImageReader::decode` (format sniffed from the bytes) |
//! | Resample | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode | `image::codecs::jpeg::JpegEncoder` on an RGB8 buffer |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(BackendError::Io)
}

impl ImageBackend for RustBackend {
    fn dimensions(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        let image = reader(bytes)?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(BackendError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(image)
    }

    fn resample(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::EmptyImage { width, height });
        }
        Ok(image.resize_exact(width, height, FilterType::Lanczos3))
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(BackendError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        // JPEG has no alpha channel; flatten everything to RGB8
        let rgb = image.to_rgb8();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality.value())
            .encode_image(&rgb)
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::encode_jpeg;

    #[test]
    fn dimensions_of_synthetic_jpeg() {
        let jpeg = encode_jpeg(200, 150);
        let dims = RustBackend::new().dimensions(&jpeg).unwrap();
        assert_eq!(dims.as_tuple(), (200, 150));
    }

    #[test]
    fn dimensions_of_garbage_errors() {
        let result = RustBackend::new().dimensions(b"not an image at all");
        assert!(result.is_err());
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let jpeg = encode_jpeg(64, 48);
        let image = RustBackend::new().decode(&jpeg).unwrap();
        assert_eq!((image.width(), image.height()), (64, 48));
    }

    #[test]
    fn decode_truncated_jpeg_errors() {
        let jpeg = encode_jpeg(64, 48);
        let result = RustBackend::new().decode(&jpeg[..20]);
        assert!(result.is_err());
    }

    #[test]
    fn resample_to_exact_size() {
        let image = DynamicImage::new_rgb8(400, 300);
        let out = RustBackend::new().resample(&image, 100, 100).unwrap();
        assert_eq!((out.width(), out.height()), (100, 100));
    }

    #[test]
    fn resample_to_zero_is_empty_image() {
        let image = DynamicImage::new_rgb8(400, 300);
        let result = RustBackend::new().resample(&image, 100, 0);
        assert!(matches!(
            result,
            Err(BackendError::EmptyImage {
                width: 100,
                height: 0
            })
        ));
    }

    #[test]
    fn encode_produces_decodable_jpeg() {
        let backend = RustBackend::new();
        let image = DynamicImage::new_rgba8(30, 20);
        let bytes = backend.encode_jpeg(&image, Quality::default()).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
        assert_eq!(backend.dimensions(&bytes).unwrap().as_tuple(), (30, 20));
    }
}

//! Image processing: source selection, orientation and rendition encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Dimensions** | `image::ImageReader::into_dimensions` |
//! | **MPF preview** | custom parser (JPEG APP2 + TIFF IFD) |
//! | **Orientation** | `DynamicImage::rotate90` / `rotate180` / `rotate270` |
//! | **Resample** | Lanczos3 |
//! | **Encode** | `JpegEncoder`, quality 95 |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for rendition geometry (unit testable)
//! - **Parameters**: Quality and rendition requests
//! - **MPF**: Multi-Picture Format index parsing
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Source selection and rendering, combining the above

pub mod backend;
mod calculations;
pub mod mpf;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    Orientation, Region, center_crop_to_ratio, center_square, covers, fit_dimensions,
};
pub use operations::{SourceImage, SourceKind, render_rendition, select_source};
pub use params::{Quality, RenditionRequest};
pub use rust_backend::RustBackend;

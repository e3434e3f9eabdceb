//! Image decoding, sizing, transforms, and encoding, all in pure Rust.
//!
//! The module is split into:
//! - **Calculations**: pure functions for the four sizing policies and crop
//!   windows (unit testable without pixels)
//! - **Backend**: [`ImageProcessor`] trait, [`DecodedImage`] and its
//!   transform/encode methods
//! - **Rust backend**: [`RustProcessor`], the `image`-crate implementation

pub mod backend;
pub mod calculations;
pub mod rust_backend;

pub use backend::{
    DecodedImage, EncodingFormat, ImageProcessor, ProcessorError, Quality, sniff_media_type,
};
pub use calculations::{CropRect, center_crop_rect, scale_plan};
pub use rust_backend::RustProcessor;

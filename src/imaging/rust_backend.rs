//! Pure Rust image processing backend built on the `image` crate.
//!
//! No system codecs or external tools are involved; everything is
//! statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image` crate (pure Rust decoders) |
//! | Scale / cover-crop | `image::imageops` with `Lanczos3` filter |
//! | Canvas synthesis | `image::RgbaImage::from_pixel` |
//! | Encode | `image` codecs (JPEG honors quality, rest lossless) |
//!
//! Locators are filesystem paths here. Cached derivative files carry no
//! extension, so decoding sniffs the format from file content rather than
//! trusting the name.

use super::backend::{DecodedImage, ImageProcessor, ProcessorError};
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use std::path::Path;

/// Pure Rust processor using the `image` crate ecosystem.
pub struct RustProcessor;

impl RustProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageProcessor for RustProcessor {
    fn read(&self, locator: &str) -> Result<DecodedImage, ProcessorError> {
        let path = Path::new(locator);
        let unreadable = |reason: String| ProcessorError::UnreadableSource {
            locator: locator.to_string(),
            reason,
        };

        let reader = ImageReader::open(path)
            .map_err(|e| unreadable(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| unreadable(e.to_string()))?;
        let media_type = reader.format().map(|f| f.to_mime_type().to_string());
        let image = reader.decode().map_err(|e| unreadable(e.to_string()))?;

        Ok(DecodedImage::new(image, media_type, Some(path.to_path_buf())))
    }

    fn create_canvas(
        &self,
        width: u32,
        height: u32,
        color: &str,
    ) -> Result<DecodedImage, ProcessorError> {
        if width == 0 || height == 0 {
            return Err(ProcessorError::ProcessingFailed(format!(
                "canvas dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let fill = parse_hex_color(color)?;
        let canvas = RgbaImage::from_pixel(width, height, fill);
        Ok(DecodedImage::new(DynamicImage::ImageRgba8(canvas), None, None))
    }
}

/// Parse a CSS-style hex color (`"eefefe"`, `"#eefefe"`, `"abc"`) to RGBA.
fn parse_hex_color(value: &str) -> Result<Rgba<u8>, ProcessorError> {
    let bad = || ProcessorError::ProcessingFailed(format!("invalid hex color {value:?}"));

    let hex = value.trim().trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(bad()),
    };

    // The length checks count bytes, so a range can still split a
    // multi-byte character; checked slicing turns that into an error.
    let channel = |range: std::ops::Range<usize>| {
        expanded
            .get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(bad)
    };
    Ok(Rgba([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255]))
}

//! Image processing backend trait and shared types.
//!
//! The [`ImageProcessor`] trait is the seam between the dispenser and the
//! pixel-level codec work: reading (decoding) a source image and synthesizing
//! blank canvases. Everything downstream of a decode — scaling, cropping,
//! encoding — happens on the [`DecodedImage`] it returns.
//!
//! The production implementation is
//! [`RustProcessor`](super::rust_backend::RustProcessor) — pure Rust via the
//! `image` crate. Tests swap in the recording mock from this module.

use super::calculations::center_crop_rect;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    /// The source image could not be fetched or decoded. Recoverable: the
    /// dispenser routes this through its fallback policy.
    #[error("unreadable source {locator}: {reason}")]
    UnreadableSource { locator: String, reason: String },
    /// The backend failed mid-operation (encode, canvas synthesis). Fatal:
    /// propagates to the caller.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

/// Output encoding for generated derivatives.
///
/// Quality only affects JPEG; the other formats encode lossless through the
/// `image` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    #[default]
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl EncodingFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Gif => image::ImageFormat::Gif,
            Self::Webp => image::ImageFormat::WebP,
        }
    }
}

/// Guess a media type from magic bytes, without decoding.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// A decoded raster image plus the metadata the dispenser cares about.
///
/// Wraps the `image` crate's [`DynamicImage`]; every transform returns a new
/// value, leaving the original untouched.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
    media_type: Option<String>,
    source_path: Option<PathBuf>,
}

impl DecodedImage {
    pub fn new(
        image: DynamicImage,
        media_type: Option<String>,
        source_path: Option<PathBuf>,
    ) -> Self {
        Self {
            image,
            media_type,
            source_path,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Media type of the decoded source, when known. A synthesized canvas has
    /// none until it is encoded.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Path the image was decoded from, when it came from a file.
    pub fn file_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Scale to exactly `width` x `height` (Lanczos3), ignoring aspect ratio.
    /// Callers pick the dimensions via
    /// [`scale_plan`](super::calculations::scale_plan).
    pub fn scale_exact(&self, width: u32, height: u32) -> DecodedImage {
        let scaled = self
            .image
            .resize_exact(width.max(1), height.max(1), FilterType::Lanczos3);
        self.derived(scaled)
    }

    /// Cut a centered `width` x `height` window out of the image without
    /// scaling. Shrinks the window when the image is smaller.
    pub fn crop_center(&self, width: u32, height: u32) -> DecodedImage {
        let rect = center_crop_rect(self.dimensions(), (width, height));
        let cropped = self.image.crop_imm(rect.x, rect.y, rect.width, rect.height);
        self.derived(cropped)
    }

    /// Scale to completely cover `width` x `height`, then center-crop to the
    /// exact size.
    pub fn fit(&self, width: u32, height: u32) -> DecodedImage {
        let filled = self
            .image
            .resize_to_fill(width.max(1), height.max(1), FilterType::Lanczos3);
        self.derived(filled)
    }

    /// Encode to bytes in the given format.
    pub fn encode(&self, format: EncodingFormat, quality: Quality) -> Result<Vec<u8>, ProcessorError> {
        let mut buf = Vec::new();
        let mut cursor = Cursor::new(&mut buf);
        match format {
            EncodingFormat::Jpeg => {
                // JPEG has no alpha channel; flatten before encoding.
                let encoder = JpegEncoder::new_with_quality(&mut cursor, quality.value() as u8);
                self.image
                    .to_rgb8()
                    .write_with_encoder(encoder)
                    .map_err(|e| {
                        ProcessorError::ProcessingFailed(format!("JPEG encode failed: {e}"))
                    })?;
            }
            other => {
                self.image.write_to(&mut cursor, other.image_format()).map_err(|e| {
                    ProcessorError::ProcessingFailed(format!(
                        "{} encode failed: {e}",
                        other.extension()
                    ))
                })?;
            }
        }
        Ok(buf)
    }

    fn derived(&self, image: DynamicImage) -> DecodedImage {
        DecodedImage {
            image,
            media_type: self.media_type.clone(),
            source_path: self.source_path.clone(),
        }
    }
}

/// Trait for image processing backends.
///
/// Only the two operations with interesting failure modes sit behind the
/// seam: `read` (the source may be missing or corrupt) and `create_canvas`
/// (synthesis may be handed a garbage color). Transforms on an already
/// decoded image are inherent [`DecodedImage`] methods.
pub trait ImageProcessor: Sync {
    /// Fetch and decode the source image at `locator`.
    fn read(&self, locator: &str) -> Result<DecodedImage, ProcessorError>;

    /// Synthesize a `width` x `height` canvas filled with the hex `color`.
    fn create_canvas(&self, width: u32, height: u32, color: &str)
    -> Result<DecodedImage, ProcessorError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::Mutex;

    /// Mock processor that records operations and serves synthetic pixels.
    /// Uses Mutex (not RefCell) so it is Sync like the production backend.
    pub struct MockProcessor {
        /// Dimensions of the image `read` pretends to decode.
        pub source_size: (u32, u32),
        /// When set, every `read` fails as an unreadable source.
        pub fail_reads: bool,
        pub reads: Mutex<Vec<String>>,
        pub canvases: Mutex<Vec<(u32, u32, String)>>,
    }

    impl Default for MockProcessor {
        fn default() -> Self {
            Self {
                source_size: (64, 48),
                fail_reads: false,
                reads: Mutex::new(Vec::new()),
                canvases: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockProcessor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail_reads: true,
                ..Self::default()
            }
        }

        pub fn read_count(&self) -> usize {
            self.reads.lock().unwrap().len()
        }

        pub fn read_locators(&self) -> Vec<String> {
            self.reads.lock().unwrap().clone()
        }
    }

    impl ImageProcessor for MockProcessor {
        fn read(&self, locator: &str) -> Result<DecodedImage, ProcessorError> {
            self.reads.lock().unwrap().push(locator.to_string());
            if self.fail_reads {
                return Err(ProcessorError::UnreadableSource {
                    locator: locator.to_string(),
                    reason: "mock failure".to_string(),
                });
            }
            let (w, h) = self.source_size;
            let img = RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
            Ok(DecodedImage::new(
                DynamicImage::ImageRgba8(img),
                Some("image/png".to_string()),
                Some(PathBuf::from(locator)),
            ))
        }

        fn create_canvas(
            &self,
            width: u32,
            height: u32,
            color: &str,
        ) -> Result<DecodedImage, ProcessorError> {
            self.canvases
                .lock()
                .unwrap()
                .push((width, height, color.to_string()));
            let img = RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
            Ok(DecodedImage::new(DynamicImage::ImageRgba8(img), None, None))
        }
    }

    #[test]
    fn mock_records_reads() {
        let p = MockProcessor::new();
        let img = p.read("/uploads/photo.png").unwrap();
        assert_eq!(img.dimensions(), (64, 48));
        assert_eq!(p.read_locators(), vec!["/uploads/photo.png".to_string()]);
    }

    #[test]
    fn mock_failing_read_is_unreadable_source() {
        let p = MockProcessor::failing();
        let err = p.read("/uploads/photo.png").unwrap_err();
        assert!(matches!(err, ProcessorError::UnreadableSource { .. }));
        assert_eq!(p.read_count(), 1);
    }

    #[test]
    fn scale_exact_hits_requested_dimensions() {
        let p = MockProcessor::new();
        let img = p.read("x").unwrap();
        let out = img.scale_exact(100, 200);
        assert_eq!(out.dimensions(), (100, 200));
    }

    #[test]
    fn crop_center_never_exceeds_source() {
        let p = MockProcessor::new();
        let img = p.read("x").unwrap(); // 64x48
        let out = img.crop_center(100, 20);
        assert_eq!(out.dimensions(), (64, 20));
    }

    #[test]
    fn fit_covers_and_crops_to_exact_size() {
        let p = MockProcessor::new();
        let img = p.read("x").unwrap();
        let out = img.fit(32, 32);
        assert_eq!(out.dimensions(), (32, 32));
    }

    #[test]
    fn encode_png_produces_decodable_bytes() {
        let p = MockProcessor::new();
        let img = p.read("x").unwrap();
        let bytes = img.encode(EncodingFormat::Png, Quality::default()).unwrap();
        let round = image::load_from_memory(&bytes).unwrap();
        assert_eq!(round.width(), 64);
        assert_eq!(round.height(), 48);
    }

    #[test]
    fn encode_jpeg_flattens_alpha() {
        let p = MockProcessor::new();
        let img = p.read("x").unwrap();
        let bytes = img.encode(EncodingFormat::Jpeg, Quality::new(80)).unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn format_extension_and_media_type_agree() {
        assert_eq!(EncodingFormat::Png.extension(), "png");
        assert_eq!(EncodingFormat::Png.media_type(), "image/png");
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Jpeg.media_type(), "image/jpeg");
    }

    #[test]
    fn sniff_media_type_reads_magic_bytes() {
        let p = MockProcessor::new();
        let img = p.read("x").unwrap();
        let bytes = img.encode(EncodingFormat::Png, Quality::default()).unwrap();
        assert_eq!(sniff_media_type(&bytes), Some("image/png"));
        assert_eq!(sniff_media_type(b"not an image"), None);
    }
}

//! Demand types: immutable descriptions of a requested derivative.
//!
//! A demand captures everything that affects a derivative's pixels — source
//! image, target dimensions, transform flags — plus whether the caller wants
//! the decoded object back instead of an HTTP-shaped response. Demands are
//! built per request and never mutated.
//!
//! ## Route-value sentinels
//!
//! Route segments arrive as strings, and several literals conventionally mean
//! "unset" rather than a real value. A raw value is considered unset when it
//! is absent or equals one of `"null"`, `"false"`, `"_"`, `"n"`, `"0"`
//! (case-insensitive). The same set applies to dimensions and boolean flags:
//! - `dimension(Some("200"))` → `Some(200)`
//! - `dimension(Some("0"))` → `None` (unset, not zero)
//! - `flag(Some("0"), default)` → `default` — a literal `"0"` cannot force a
//!   flag off; routes that need that pass `"no"` or omit the segment and rely
//!   on the default.
//!
//! Non-numeric garbage in a dimension segment also resolves to `None`.

/// Route literals treated as "unset". Absent values are unset as well.
const NULL_SENTINELS: [&str; 5] = ["null", "false", "_", "n", "0"];

fn is_unset(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(v) => NULL_SENTINELS
            .iter()
            .any(|s| v.eq_ignore_ascii_case(s)),
    }
}

/// Resolve a raw route value to a dimension.
pub fn dimension(raw: Option<&str>) -> Option<u32> {
    if is_unset(raw) {
        return None;
    }
    raw.and_then(|v| v.trim().parse::<u32>().ok())
}

/// Resolve a raw route value to a boolean flag, falling back to `default`
/// when the value is unset.
pub fn flag(raw: Option<&str>, default: bool) -> bool {
    if is_unset(raw) {
        return default;
    }
    matches!(
        raw.map(str::trim),
        Some(v) if v.eq_ignore_ascii_case("1")
            || v.eq_ignore_ascii_case("true")
            || v.eq_ignore_ascii_case("yes")
            || v.eq_ignore_ascii_case("y")
    )
}

/// The narrow view of an application's image model that demands need:
/// a stable name for cache keys and a retrieval locator for the bytes.
pub trait SourceImage {
    /// Stable identifier, used as a cache-key component.
    fn name(&self) -> &str;

    /// Retrieval locator. `relative` selects the upload-store-relative form;
    /// the dispenser resolves it to an absolute location, never parses it.
    fn url(&self, relative: bool) -> String;
}

/// Source-image reference carried by a demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub name: String,
    pub locator: String,
}

impl SourceRef {
    pub fn new(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
        }
    }

    /// Build a reference from any [`SourceImage`], taking the relative locator.
    pub fn for_image(image: &impl SourceImage) -> Self {
        Self {
            name: image.name().to_string(),
            locator: image.url(true),
        }
    }
}

/// Demand for a resized derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resize {
    pub source: SourceRef,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Preserve the source aspect ratio (proportional scale).
    pub maintain_aspect: bool,
    /// Allow the derivative to exceed the source dimensions.
    pub allow_upscale: bool,
    /// Return the decoded derivative instead of an HTTP-shaped response.
    pub return_object: bool,
}

impl Resize {
    /// Typed constructor with the conventional flag defaults:
    /// aspect preserved, upscaling off.
    pub fn new(source: SourceRef, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            source,
            width,
            height,
            maintain_aspect: true,
            allow_upscale: false,
            return_object: false,
        }
    }

    /// Construct from raw route segments, applying sentinel resolution.
    pub fn from_route(
        source: SourceRef,
        width: Option<&str>,
        height: Option<&str>,
        aspect: Option<&str>,
        upscale: Option<&str>,
    ) -> Self {
        Self {
            source,
            width: dimension(width),
            height: dimension(height),
            maintain_aspect: flag(aspect, true),
            allow_upscale: flag(upscale, false),
            return_object: false,
        }
    }

    pub fn returning_object(mut self) -> Self {
        self.return_object = true;
        self
    }
}

/// Thumbnail transform methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbMethod {
    /// Centered cut of the exact window, no scaling.
    Crop,
    /// Scale to cover the window, then center-crop.
    Fit,
}

impl ThumbMethod {
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("crop") {
            Some(Self::Crop)
        } else if value.eq_ignore_ascii_case("fit") {
            Some(Self::Fit)
        } else {
            None
        }
    }

    /// Canonical lowercase name, used in cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Fit => "fit",
        }
    }
}

/// Demand for a thumbnail derivative.
///
/// The method arrives as a raw route value and is kept verbatim; building a
/// demand never fails. [`Thumbnail::is_valid`] is the gate the dispenser
/// checks before doing any work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub source: SourceRef,
    pub method: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub return_object: bool,
}

impl Thumbnail {
    pub fn new(
        source: SourceRef,
        method: impl Into<String>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Self {
        Self {
            source,
            method: method.into(),
            width,
            height,
            return_object: false,
        }
    }

    /// Construct from raw route segments, applying sentinel resolution.
    pub fn from_route(
        source: SourceRef,
        method: &str,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Self {
        Self {
            source,
            method: method.to_string(),
            width: dimension(width),
            height: dimension(height),
            return_object: false,
        }
    }

    pub fn returning_object(mut self) -> Self {
        self.return_object = true;
        self
    }

    pub fn method(&self) -> Option<ThumbMethod> {
        ThumbMethod::parse(&self.method)
    }

    pub fn is_valid(&self) -> bool {
        self.method().is_some()
    }
}

/// Default fill color for dummy images.
pub const DEFAULT_DUMMY_COLOR: &str = "eefefe";

/// Demand for a synthesized placeholder image. No source, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dummy {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color: String,
}

impl Dummy {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width,
            height,
            color: DEFAULT_DUMMY_COLOR.to_string(),
        }
    }

    /// Construct from raw route segments, applying sentinel resolution.
    /// An unset color segment falls back to [`DEFAULT_DUMMY_COLOR`].
    pub fn from_route(width: Option<&str>, height: Option<&str>, color: Option<&str>) -> Self {
        let color = match color {
            Some(c) if !is_unset(Some(c)) => c.to_string(),
            _ => DEFAULT_DUMMY_COLOR.to_string(),
        };
        Self {
            width: dimension(width),
            height: dimension(height),
            color,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceRef {
        SourceRef::new("my-image", "//image_url")
    }

    // =========================================================================
    // Sentinel resolution
    // =========================================================================

    #[test]
    fn every_sentinel_resolves_to_unset_dimension() {
        for raw in [None, Some("null"), Some("false"), Some("_"), Some("n"), Some("0")] {
            assert_eq!(dimension(raw), None, "{raw:?} should be unset");
        }
    }

    #[test]
    fn sentinels_are_case_insensitive() {
        assert_eq!(dimension(Some("NULL")), None);
        assert_eq!(dimension(Some("False")), None);
        assert_eq!(dimension(Some("N")), None);
    }

    #[test]
    fn numeric_dimension_resolves() {
        assert_eq!(dimension(Some("200")), Some(200));
        assert_eq!(dimension(Some("1")), Some(1));
    }

    #[test]
    fn zero_is_unset_not_zero() {
        // "0" is in the sentinel set: unspecified, never a 0-pixel target
        assert_eq!(dimension(Some("0")), None);
    }

    #[test]
    fn garbage_dimension_is_unset() {
        assert_eq!(dimension(Some("abc")), None);
        assert_eq!(dimension(Some("-5")), None);
    }

    #[test]
    fn flag_sentinels_take_the_default() {
        for raw in [None, Some("null"), Some("false"), Some("_"), Some("n"), Some("0")] {
            assert!(flag(raw, true), "{raw:?} should fall back to default");
            assert!(!flag(raw, false), "{raw:?} should fall back to default");
        }
    }

    #[test]
    fn flag_truthy_forms() {
        for raw in ["1", "true", "TRUE", "yes", "y"] {
            assert!(flag(Some(raw), false), "{raw:?} should be true");
        }
    }

    #[test]
    fn flag_other_values_are_false() {
        assert!(!flag(Some("no"), true));
        assert!(!flag(Some("off"), true));
    }

    // =========================================================================
    // Demand construction
    // =========================================================================

    #[test]
    fn resize_defaults() {
        let d = Resize::new(source(), Some(100), Some(200));
        assert!(d.maintain_aspect);
        assert!(!d.allow_upscale);
        assert!(!d.return_object);
    }

    #[test]
    fn resize_from_route_resolves_sentinels() {
        let d = Resize::from_route(source(), Some("100"), Some("n"), Some("0"), Some("1"));
        assert_eq!(d.width, Some(100));
        assert_eq!(d.height, None);
        assert!(d.maintain_aspect); // "0" is a sentinel → default true
        assert!(d.allow_upscale);
    }

    #[test]
    fn thumbnail_method_gate() {
        let valid = Thumbnail::new(source(), "crop", Some(100), Some(100));
        assert!(valid.is_valid());
        assert_eq!(valid.method(), Some(ThumbMethod::Crop));

        let shouty = Thumbnail::new(source(), "FIT", Some(100), Some(100));
        assert!(shouty.is_valid());
        assert_eq!(shouty.method(), Some(ThumbMethod::Fit));

        let bogus = Thumbnail::new(source(), "grab", Some(100), Some(100));
        assert!(!bogus.is_valid());
        assert_eq!(bogus.method(), None);
    }

    #[test]
    fn thumbnail_construction_never_fails_on_bad_method() {
        // The raw value stays representable; only the gate flags it
        let d = Thumbnail::from_route(source(), "grab", Some("64"), Some("64"));
        assert_eq!(d.method, "grab");
        assert!(!d.is_valid());
    }

    #[test]
    fn dummy_color_defaults() {
        assert_eq!(Dummy::new(Some(8), Some(8)).color, "eefefe");
        let d = Dummy::from_route(Some("8"), Some("8"), Some("_"));
        assert_eq!(d.color, "eefefe");
        let d = Dummy::from_route(Some("8"), Some("8"), Some("ffcc00"));
        assert_eq!(d.color, "ffcc00");
    }

    #[test]
    fn source_ref_from_source_image() {
        struct Upload;
        impl SourceImage for Upload {
            fn name(&self) -> &str {
                "upload-7"
            }
            fn url(&self, relative: bool) -> String {
                if relative {
                    "uploads/7.png".to_string()
                } else {
                    "/var/app/uploads/7.png".to_string()
                }
            }
        }

        let s = SourceRef::for_image(&Upload);
        assert_eq!(s.name, "upload-7");
        assert_eq!(s.locator, "uploads/7.png");
    }
}

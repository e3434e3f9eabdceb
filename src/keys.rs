//! Cache-key construction.
//!
//! A cache key is a storage-relative path (forward slashes, no extension)
//! that encodes every parameter affecting a derivative's pixel content. Two
//! demands that would produce different pixels must map to different keys;
//! identical demands must map to the identical key so repeat requests hit
//! the same entry.
//!
//! Builders are pure string functions. Callers resolve optional dimensions
//! before calling; an unresolved dimension never reaches this module.

use crate::demand::ThumbMethod;

fn bit(value: bool) -> u8 {
    if value { 1 } else { 0 }
}

/// Key for a resized derivative:
/// `{root}/{width}-{height}-_-{aspect}_{upscale}_{name}`.
pub fn resize_key(
    root: &str,
    source_name: &str,
    width: u32,
    height: u32,
    maintain_aspect: bool,
    allow_upscale: bool,
) -> String {
    format!(
        "{root}/{width}-{height}-_-{aspect}_{upscale}_{source_name}",
        aspect = bit(maintain_aspect),
        upscale = bit(allow_upscale),
    )
}

/// Key for a thumbnail derivative:
/// `{root}/{width}-{height}-_-{method}_{name}`.
///
/// The method renders as its canonical lowercase name, so `"CROP"` and
/// `"crop"` demands share an entry.
pub fn thumbnail_key(
    root: &str,
    source_name: &str,
    width: u32,
    height: u32,
    method: ThumbMethod,
) -> String {
    format!(
        "{root}/{width}-{height}-_-{method}_{source_name}",
        method = method.as_str(),
    )
}

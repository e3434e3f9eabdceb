//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! Resizing has four policies, keyed by `(maintain_aspect, allow_upscale)`:
//!
//! | aspect | upscale | behavior |
//! |---|---|---|
//! | yes | yes | proportional scale into the target box, may enlarge |
//! | yes | no  | proportional scale, never beyond the source size |
//! | no  | yes | exact target dimensions, may enlarge |
//! | no  | no  | exact per axis, each capped at the source size |

/// Final pixel dimensions for a resize request.
///
/// `source` and `target` are `(width, height)`. The result is what the
/// backend should scale to; both components are at least 1.
pub fn scale_plan(
    source: (u32, u32),
    target: (u32, u32),
    maintain_aspect: bool,
    allow_upscale: bool,
) -> (u32, u32) {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let (tgt_w, tgt_h) = target;

    if !maintain_aspect {
        let w = if allow_upscale { tgt_w } else { tgt_w.min(src_w) };
        let h = if allow_upscale { tgt_h } else { tgt_h.min(src_h) };
        return (w.max(1), h.max(1));
    }

    // Proportional: fit within the target box.
    let ratio_w = tgt_w as f64 / src_w as f64;
    let ratio_h = tgt_h as f64 / src_h as f64;
    let mut ratio = ratio_w.min(ratio_h);
    if !allow_upscale {
        ratio = ratio.min(1.0);
    }

    let w = (src_w as f64 * ratio).round() as u32;
    let h = (src_h as f64 * ratio).round() as u32;
    (w.max(1), h.max(1))
}

/// A crop window within a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Centered crop window of at most `target` size.
///
/// When the source is smaller than the target on an axis, the window shrinks
/// to the source extent on that axis — cropping never pads. As with
/// [`scale_plan`], zero inputs are treated as 1.
pub fn center_crop_rect(source: (u32, u32), target: (u32, u32)) -> CropRect {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let (tgt_w, tgt_h) = target;

    let width = tgt_w.min(src_w).max(1);
    let height = tgt_h.min(src_h).max(1);
    CropRect {
        x: (src_w - width) / 2,
        y: (src_h - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // scale_plan: aspect-preserving policies
    // =========================================================================

    #[test]
    fn aspect_upscale_enlarges_into_box() {
        // 100x50 into 400x400 → limited by width ratio 4.0
        assert_eq!(scale_plan((100, 50), (400, 400), true, true), (400, 200));
    }

    #[test]
    fn aspect_upscale_shrinks_into_box() {
        // 2000x1000 into 400x400 → ratio 0.2
        assert_eq!(scale_plan((2000, 1000), (400, 400), true, true), (400, 200));
    }

    #[test]
    fn aspect_no_upscale_caps_at_source() {
        // 100x50 into 400x400 would need ratio 4.0 → capped at 1.0
        assert_eq!(scale_plan((100, 50), (400, 400), true, false), (100, 50));
    }

    #[test]
    fn aspect_no_upscale_still_shrinks() {
        assert_eq!(scale_plan((800, 600), (400, 400), true, false), (400, 300));
    }

    #[test]
    fn aspect_ratio_chooses_tighter_axis() {
        // 300x100 into 150x100: width ratio 0.5, height ratio 1.0 → 0.5
        assert_eq!(scale_plan((300, 100), (150, 100), true, true), (150, 50));
    }

    // =========================================================================
    // scale_plan: exact policies
    // =========================================================================

    #[test]
    fn exact_upscale_uses_target_verbatim() {
        assert_eq!(scale_plan((100, 50), (400, 300), false, true), (400, 300));
    }

    #[test]
    fn exact_no_upscale_caps_each_axis() {
        // width capped at 100, height already below source
        assert_eq!(scale_plan((100, 500), (400, 300), false, false), (100, 300));
    }

    #[test]
    fn exact_no_upscale_passes_smaller_target() {
        assert_eq!(scale_plan((800, 600), (400, 300), false, false), (400, 300));
    }

    #[test]
    fn scale_never_returns_zero() {
        assert_eq!(scale_plan((1000, 1000), (1, 1), true, true), (1, 1));
        // Extreme aspect: 10000x1 into 5x5 → height would round to 0
        let (w, h) = scale_plan((10000, 1), (5, 5), true, true);
        assert!(w >= 1 && h >= 1);
    }

    // =========================================================================
    // center_crop_rect
    // =========================================================================

    #[test]
    fn crop_centers_within_larger_source() {
        let r = center_crop_rect((800, 600), (400, 200));
        assert_eq!(
            r,
            CropRect {
                x: 200,
                y: 200,
                width: 400,
                height: 200
            }
        );
    }

    #[test]
    fn crop_shrinks_to_source_when_target_exceeds() {
        let r = center_crop_rect((300, 100), (400, 200));
        assert_eq!(
            r,
            CropRect {
                x: 0,
                y: 0,
                width: 300,
                height: 100
            }
        );
    }

    #[test]
    fn crop_exact_match_is_full_frame() {
        let r = center_crop_rect((400, 500), (400, 500));
        assert_eq!(r.x, 0);
        assert_eq!(r.y, 0);
        assert_eq!((r.width, r.height), (400, 500));
    }

    #[test]
    fn crop_odd_remainder_rounds_down() {
        // 5 pixels of slack → offset 2
        let r = center_crop_rect((405, 500), (400, 500));
        assert_eq!(r.x, 2);
        assert_eq!(r.y, 0);
    }

    #[test]
    fn crop_tolerates_zero_sized_inputs() {
        // Degenerate sources clamp to a 1x1 window rather than underflowing
        let r = center_crop_rect((0, 0), (400, 200));
        assert_eq!(
            r,
            CropRect {
                x: 0,
                y: 0,
                width: 1,
                height: 1
            }
        );

        let r = center_crop_rect((100, 50), (0, 0));
        assert_eq!((r.width, r.height), (1, 1));
    }
}

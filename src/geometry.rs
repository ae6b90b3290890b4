//! Pure calculation functions for transform geometry.
//!
//! All functions here are pure and testable without any I/O or processes.
//! Dimension math uses `f64` intermediates and truncates toward zero on the
//! way back to pixels, so results are bit-for-bit stable across platforms.

/// Aspect-preserving fit policy for [`best_fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// Result is at least as large as the box in both dimensions.
    Upscale,
    /// Result fits inside the box in both dimensions.
    Downscale,
}

/// One of nine reference points placing a region within a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

/// Calculate aspect-preserving dimensions fitting a target box.
///
/// Candidate dimensions are computed along the image's dominant axis: a wide
/// image fixes height and derives width, a tall or square image fixes width
/// and derives height. If the candidate's secondary dimension violates the
/// fit policy (exceeds the box for [`Fit::Downscale`], falls short of it for
/// [`Fit::Upscale`]), the fixed axis is switched.
///
/// # Examples
/// ```
/// # use darkroom::geometry::{best_fit, Fit};
/// // 431x324 into a 300x300 box, downscale: 300x225
/// assert_eq!(best_fit(431, 324, 300, 300, Fit::Downscale), (300, 225));
///
/// // Same image and box, upscale: 399x300
/// assert_eq!(best_fit(431, 324, 300, 300, Fit::Upscale), (399, 300));
/// ```
pub fn best_fit(orig_w: u32, orig_h: u32, box_w: u32, box_h: u32, fit: Fit) -> (u32, u32) {
    let ratio = orig_w as f64 / orig_h as f64;

    if orig_w > orig_h {
        let mut h = box_h;
        let mut w = (h as f64 * ratio) as u32;

        if (fit == Fit::Downscale && w > box_w) || (fit == Fit::Upscale && box_w > w) {
            w = box_w;
            h = (w as f64 / ratio) as u32;
        }
        (w, h)
    } else {
        let mut w = box_w;
        let mut h = (w as f64 / ratio) as u32;

        if (fit == Fit::Downscale && h > box_h) || (fit == Fit::Upscale && box_h > h) {
            h = box_h;
            w = (h as f64 * ratio) as u32;
        }
        (w, h)
    }
}

/// Calculate the largest aspect-preserving size contained by a target box.
///
/// Applies `min(box_w/orig_w, box_h/orig_h)` uniformly to both dimensions —
/// the inner image size before letterboxing with [`Anchor::Center`] padding.
pub fn best_pad(orig_w: u32, orig_h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    let ratio = if orig_w as f64 / box_w as f64 > orig_h as f64 / box_h as f64 {
        box_w as f64 / orig_w as f64
    } else {
        box_h as f64 / orig_h as f64
    };

    ((orig_w as f64 * ratio) as u32, (orig_h as f64 * ratio) as u32)
}

/// Map an anchor to the (x, y) offset of a `w`×`h` region within an
/// `orig_w`×`orig_h` canvas.
///
/// `x ∈ {0, (orig_w−w)/2, orig_w−w}` and `y ∈ {0, (orig_h−h)/2, orig_h−h}`,
/// selected by the anchor's horizontal and vertical component. Offsets
/// saturate at zero: a region larger than the canvas anchors at the origin
/// rather than producing a wrapped or mirrored offset. Oversized regions are
/// rejected at commit anyway, so the saturated values are never executed.
///
/// # Examples
/// ```
/// # use darkroom::geometry::{anchor_offset, Anchor};
/// assert_eq!(anchor_offset(431, 324, 300, 300, Anchor::Center), (65, 12));
/// assert_eq!(anchor_offset(431, 324, 300, 300, Anchor::TopLeft), (0, 0));
/// ```
pub fn anchor_offset(orig_w: u32, orig_h: u32, w: u32, h: u32, anchor: Anchor) -> (u32, u32) {
    let mid_x = orig_w.saturating_sub(w) / 2;
    let end_x = orig_w.saturating_sub(w);
    let mid_y = orig_h.saturating_sub(h) / 2;
    let end_y = orig_h.saturating_sub(h);

    match anchor {
        Anchor::TopLeft => (0, 0),
        Anchor::Top => (mid_x, 0),
        Anchor::TopRight => (end_x, 0),
        Anchor::Left => (0, mid_y),
        Anchor::Center => (mid_x, mid_y),
        Anchor::Right => (end_x, mid_y),
        Anchor::BottomLeft => (0, end_y),
        Anchor::Bottom => (mid_x, end_y),
        Anchor::BottomRight => (end_x, end_y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // best_fit tests
    // =========================================================================

    #[test]
    fn best_fit_downscale_wide_image() {
        // 431x324 into 300x300: height-derived 399x300 overflows, clamp to 300x225
        assert_eq!(best_fit(431, 324, 300, 300, Fit::Downscale), (300, 225));
    }

    #[test]
    fn best_fit_upscale_wide_image() {
        // 431x324 into 300x300: 399x300 already covers the box
        assert_eq!(best_fit(431, 324, 300, 300, Fit::Upscale), (399, 300));
    }

    #[test]
    fn best_fit_downscale_tall_image() {
        // 300x450 into 200x200: width-derived 200x300 overflows, clamp to 133x200
        assert_eq!(best_fit(300, 450, 200, 200, Fit::Downscale), (133, 200));
    }

    #[test]
    fn best_fit_upscale_tall_image() {
        // 300x450 into 400x400: width-derived 400x600 already covers
        assert_eq!(best_fit(300, 450, 400, 400, Fit::Upscale), (400, 600));
    }

    #[test]
    fn best_fit_upscale_from_docs() {
        // The documented case: 300x225 into 400x400 upscales to 533x400
        assert_eq!(best_fit(300, 225, 400, 400, Fit::Upscale), (533, 400));
    }

    #[test]
    fn best_fit_downscale_from_docs() {
        // The documented case: 300x225 into 400x400 downscales to 400x300
        assert_eq!(best_fit(300, 225, 400, 400, Fit::Downscale), (400, 300));
    }

    #[test]
    fn best_fit_square_image_uses_width_axis() {
        assert_eq!(best_fit(200, 200, 100, 300, Fit::Downscale), (100, 100));
        assert_eq!(best_fit(200, 200, 300, 100, Fit::Downscale), (100, 100));
    }

    #[test]
    fn best_fit_downscale_never_exceeds_box() {
        for (ow, oh) in [(431, 324), (324, 431), (1920, 1080), (97, 997)] {
            for (bw, bh) in [(300, 300), (120, 640), (640, 120)] {
                let (w, h) = best_fit(ow, oh, bw, bh, Fit::Downscale);
                assert!(w <= bw && h <= bh, "{ow}x{oh} into {bw}x{bh} gave {w}x{h}");
            }
        }
    }

    #[test]
    fn best_fit_upscale_never_undershoots_box() {
        for (ow, oh) in [(431, 324), (324, 431), (1920, 1080), (97, 997)] {
            for (bw, bh) in [(300, 300), (120, 640), (640, 120)] {
                let (w, h) = best_fit(ow, oh, bw, bh, Fit::Upscale);
                assert!(w >= bw && h >= bh, "{ow}x{oh} into {bw}x{bh} gave {w}x{h}");
            }
        }
    }

    #[test]
    fn best_fit_preserves_aspect_within_one_pixel() {
        let (w, h) = best_fit(431, 324, 300, 300, Fit::Downscale);
        let expected_h = (w as f64 * 324.0 / 431.0) as u32;
        assert!(h.abs_diff(expected_h) <= 1);
    }

    // =========================================================================
    // best_pad tests
    // =========================================================================

    #[test]
    fn best_pad_wide_image_limited_by_width() {
        // 431x324 into 300x300: width is the tighter axis
        assert_eq!(best_pad(431, 324, 300, 300), (300, 225));
    }

    #[test]
    fn best_pad_tall_image_limited_by_height() {
        assert_eq!(best_pad(324, 431, 300, 300), (225, 300));
    }

    #[test]
    fn best_pad_fits_inside_box() {
        for (ow, oh) in [(431, 324), (324, 431), (1000, 1000), (50, 900)] {
            let (w, h) = best_pad(ow, oh, 300, 300);
            assert!(w <= 300 && h <= 300, "{ow}x{oh} gave {w}x{h}");
        }
    }

    #[test]
    fn best_pad_matching_aspect_fills_box() {
        assert_eq!(best_pad(800, 600, 400, 300), (400, 300));
    }

    // =========================================================================
    // anchor_offset tests
    // =========================================================================

    #[test]
    fn anchor_offset_center() {
        assert_eq!(anchor_offset(500, 500, 300, 200, Anchor::Center), (100, 150));
    }

    #[test]
    fn anchor_offset_corners() {
        assert_eq!(anchor_offset(500, 500, 300, 200, Anchor::TopLeft), (0, 0));
        assert_eq!(anchor_offset(500, 500, 300, 200, Anchor::TopRight), (200, 0));
        assert_eq!(anchor_offset(500, 500, 300, 200, Anchor::BottomLeft), (0, 300));
        assert_eq!(
            anchor_offset(500, 500, 300, 200, Anchor::BottomRight),
            (200, 300)
        );
    }

    #[test]
    fn anchor_offset_edge_midpoints() {
        assert_eq!(anchor_offset(500, 500, 300, 200, Anchor::Top), (100, 0));
        assert_eq!(anchor_offset(500, 500, 300, 200, Anchor::Left), (0, 150));
        assert_eq!(anchor_offset(500, 500, 300, 200, Anchor::Right), (200, 150));
        assert_eq!(anchor_offset(500, 500, 300, 200, Anchor::Bottom), (100, 300));
    }

    #[test]
    fn anchor_offset_oversized_region_saturates_to_origin() {
        // Region larger than the canvas: offsets clamp to zero, never mirror
        assert_eq!(anchor_offset(300, 300, 500, 500, Anchor::Center), (0, 0));
        assert_eq!(anchor_offset(300, 300, 500, 500, Anchor::BottomRight), (0, 0));
    }

    #[test]
    fn anchor_offset_odd_remainder_truncates() {
        // (431-300)/2 = 65, (324-300)/2 = 12
        assert_eq!(anchor_offset(431, 324, 300, 300, Anchor::Center), (65, 12));
    }
}

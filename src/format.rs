//! Output container formats and codec quality mapping.
//!
//! Two fixed tables live here, both consulted once at commit time:
//!
//! - suffix → format, for inferring the container from the destination path;
//! - format → native quality range, for translating the normalized 1–100
//!   quality into the engine parameter each codec actually accepts.
//!
//! Formats without a native quality knob (PNG, GIF) are compacted after the
//! engine run by an external helper instead — see the commit pipeline.

use std::fmt;
use std::path::Path;

/// Output container format.
///
/// Resolved at commit time, either explicitly via
/// [`Image::set_format`](crate::Image::set_format) or inferred from the
/// destination suffix. An unresolvable format aborts the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    JpegXl,
    Webp,
    Png,
    Avif,
    Apng,
    Bmp,
    Gif,
}

/// A codec's native quality parameter range and direction.
///
/// `lower_is_better` codecs (JPEG qscale, AVIF crf) treat the low end of the
/// range as best quality; the rest scale upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeQuality {
    pub min: u32,
    pub max: u32,
    pub lower_is_better: bool,
    /// Engine argument key carrying the mapped value.
    pub arg: &'static str,
}

impl ImageFormat {
    /// Infer a format from a destination path's suffix.
    ///
    /// Unknown or missing suffixes yield `None`; the caller decides whether
    /// that is fatal.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "apng" => Some(Self::Apng),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "bmp" => Some(Self::Bmp),
            "jxl" => Some(Self::JpegXl),
            _ => None,
        }
    }

    /// Primary file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::JpegXl => "jxl",
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Avif => "avif",
            Self::Apng => "apng",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
        }
    }

    /// Whether the container is inherently single-frame.
    ///
    /// Selecting a static format forces drop-frames semantics, since the
    /// container cannot carry an animation.
    pub fn is_static(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Bmp)
    }

    /// Whether the format is palette-limited animation (GIF).
    ///
    /// These need a shared palette generated and re-applied around the
    /// filter chain to keep transparency and color fidelity.
    pub fn is_palette_animated(self) -> bool {
        matches!(self, Self::Gif)
    }

    /// Engine argument key for the animation loop count.
    pub fn loop_arg(self) -> &'static str {
        match self {
            Self::Apng => "plays",
            _ => "loop",
        }
    }

    /// The codec's native quality range, or `None` for formats that are only
    /// compacted post-process (PNG, GIF) or carry no quality knob at all.
    pub fn native_quality(self) -> Option<NativeQuality> {
        match self {
            Self::Avif => Some(NativeQuality {
                min: 0,
                max: 63,
                lower_is_better: true,
                arg: "crf",
            }),
            Self::Jpeg => Some(NativeQuality {
                min: 2,
                max: 31,
                lower_is_better: true,
                arg: "qscale:v",
            }),
            Self::JpegXl => Some(NativeQuality {
                min: 0,
                max: 100,
                lower_is_better: false,
                arg: "qscale:v",
            }),
            Self::Webp => Some(NativeQuality {
                min: 0,
                max: 100,
                lower_is_better: false,
                arg: "quality",
            }),
            Self::Png | Self::Apng | Self::Bmp | Self::Gif => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Linearly interpolate a normalized quality into a codec's native range.
///
/// `quality` is 0–100. For `lower_is_better` ranges the interpolation runs
/// from `max` down to `min` as quality rises; otherwise upward from `min`.
/// The delta is truncated toward zero before adding to the base, so the
/// endpoints land exactly on the range bounds.
///
/// # Examples
/// ```
/// # use darkroom::format::quality_factor;
/// // JPEG qscale: best quality is 2, worst is 31
/// assert_eq!(quality_factor(2, 31, 100, true), 2);
/// assert_eq!(quality_factor(2, 31, 0, true), 31);
/// assert_eq!(quality_factor(2, 31, 50, true), 17);
/// ```
pub fn quality_factor(min: u32, max: u32, quality: u32, lower_is_better: bool) -> u32 {
    let q = quality as f64 / 100.0;
    if lower_is_better {
        let delta = (q * (min as f64 - max as f64)) as i64;
        (max as i64 + delta) as u32
    } else {
        let delta = (q * (max as f64 - min as f64)) as i64;
        (min as i64 + delta) as u32
    }
}

impl NativeQuality {
    /// Map a normalized 1–100 quality into this range via [`quality_factor`].
    pub fn map(self, quality: u32) -> u32 {
        quality_factor(self.min, self.max, quality, self.lower_is_better)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Suffix inference tests
    // =========================================================================

    #[test]
    fn from_path_known_suffixes() {
        let cases = [
            ("out.png", ImageFormat::Png),
            ("out.apng", ImageFormat::Apng),
            ("out.jpg", ImageFormat::Jpeg),
            ("out.jpeg", ImageFormat::Jpeg),
            ("out.gif", ImageFormat::Gif),
            ("out.webp", ImageFormat::Webp),
            ("out.avif", ImageFormat::Avif),
            ("out.bmp", ImageFormat::Bmp),
            ("out.jxl", ImageFormat::JpegXl),
        ];
        for (path, format) in cases {
            assert_eq!(ImageFormat::from_path(Path::new(path)), Some(format));
        }
    }

    #[test]
    fn from_path_is_case_insensitive() {
        assert_eq!(
            ImageFormat::from_path(Path::new("photo.JPEG")),
            Some(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn from_path_unknown_or_missing_suffix() {
        assert_eq!(ImageFormat::from_path(Path::new("out.tiff")), None);
        assert_eq!(ImageFormat::from_path(Path::new("out")), None);
    }

    #[test]
    fn static_formats_cannot_animate() {
        assert!(ImageFormat::Jpeg.is_static());
        assert!(ImageFormat::Png.is_static());
        assert!(ImageFormat::Bmp.is_static());
        assert!(!ImageFormat::Gif.is_static());
        assert!(!ImageFormat::Webp.is_static());
        assert!(!ImageFormat::Apng.is_static());
    }

    #[test]
    fn apng_loops_via_plays() {
        assert_eq!(ImageFormat::Apng.loop_arg(), "plays");
        assert_eq!(ImageFormat::Gif.loop_arg(), "loop");
        assert_eq!(ImageFormat::Webp.loop_arg(), "loop");
    }

    // =========================================================================
    // quality_factor tests
    // =========================================================================

    #[test]
    fn quality_factor_endpoints_lower_is_better() {
        assert_eq!(quality_factor(0, 63, 100, true), 0);
        assert_eq!(quality_factor(0, 63, 0, true), 63);
    }

    #[test]
    fn quality_factor_endpoints_higher_is_better() {
        assert_eq!(quality_factor(0, 100, 100, false), 100);
        assert_eq!(quality_factor(0, 100, 0, false), 0);
    }

    #[test]
    fn quality_factor_jpeg_midpoint_is_default_qscale() {
        // 31 + trunc(0.5 * (2 - 31)) = 31 - 14 = 17, ffmpeg's default qscale
        assert_eq!(quality_factor(2, 31, 50, true), 17);
    }

    #[test]
    fn quality_factor_is_monotonic() {
        let mut last = quality_factor(2, 31, 0, true);
        for q in 1..=100 {
            let v = quality_factor(2, 31, q, true);
            assert!(v <= last, "q={q}: {v} > {last}");
            last = v;
        }

        let mut last = quality_factor(0, 100, 0, false);
        for q in 1..=100 {
            let v = quality_factor(0, 100, q, false);
            assert!(v >= last, "q={q}: {v} < {last}");
            last = v;
        }
    }

    #[test]
    fn native_quality_table_matches_codecs() {
        let avif = ImageFormat::Avif.native_quality().unwrap();
        assert_eq!((avif.min, avif.max, avif.lower_is_better), (0, 63, true));
        assert_eq!(avif.arg, "crf");

        let jpeg = ImageFormat::Jpeg.native_quality().unwrap();
        assert_eq!((jpeg.min, jpeg.max, jpeg.lower_is_better), (2, 31, true));
        assert_eq!(jpeg.arg, "qscale:v");

        let webp = ImageFormat::Webp.native_quality().unwrap();
        assert_eq!((webp.min, webp.max, webp.lower_is_better), (0, 100, false));
        assert_eq!(webp.arg, "quality");

        let jxl = ImageFormat::JpegXl.native_quality().unwrap();
        assert_eq!(jxl.arg, "qscale:v");

        assert!(ImageFormat::Png.native_quality().is_none());
        assert!(ImageFormat::Gif.native_quality().is_none());
    }

    #[test]
    fn native_quality_map_best_jpeg() {
        assert_eq!(ImageFormat::Jpeg.native_quality().unwrap().map(100), 2);
    }
}

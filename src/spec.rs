//! The accumulating output specification.
//!
//! These types describe *what* the engine should do, not *how* to do it.
//! Builder methods on [`Image`](crate::Image) append to an [`OutputSpec`];
//! the commit pipeline compiles it into a single engine invocation. This
//! separation keeps every builder call infallible and side-effect free —
//! nothing executes, and nothing is validated against a live process, until
//! commit.
//!
//! Ordering is load-bearing: filters apply left-to-right in append order and
//! are never reordered or deduplicated, and engine arguments keep their
//! append order too.

use std::path::PathBuf;
use thiserror::Error;

use crate::format::ImageFormat;

/// A crop or pad request incompatible with the dimensions it applies to.
///
/// Recorded by the builder when the request is made (so chaining stays
/// infallible) and surfaced as a fatal error at commit, before any process
/// side effect.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryViolation {
    #[error("crop region {w}x{h} exceeds the current {current_w}x{current_h} image")]
    CropExceedsSource {
        w: u32,
        h: u32,
        current_w: u32,
        current_h: u32,
    },
    #[error("pad box {w}x{h} is smaller than the current {current_w}x{current_h} image")]
    PadShrinksSource {
        w: u32,
        h: u32,
        current_w: u32,
        current_h: u32,
    },
}

/// One named transform stage with ordered, positional arguments.
///
/// Rendered as `name=arg0:arg1:…` (or bare `name` without arguments) in the
/// engine's filter-chain syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub args: Vec<String>,
}

impl Filter {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Render into the engine's `name=a:b:c` filter syntax.
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            self.name.clone()
        } else {
            format!("{}={}", self.name, self.args.join(":"))
        }
    }
}

/// Everything the commit pipeline needs to drive one engine run.
///
/// Owned exclusively by its [`Image`](crate::Image) session; built up by the
/// chained methods and consumed at commit.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    /// Destination path, populated at commit time.
    pub path: PathBuf,
    /// Ordered filter chain. Append-only.
    pub filters: Vec<Filter>,
    /// Ordered engine options as key/value pairs. Append-only.
    pub args: Vec<(String, String)>,
    /// Normalized quality: 0 = not configured (codec default), else 1–100.
    pub quality: u32,
    /// Animation loop count: -1 no loop, 0 infinite, N = N extra plays.
    pub loop_count: i32,
    /// Resolved container format; `None` until resolution.
    pub format: Option<ImageFormat>,
    /// Re-apply the source's metadata onto the committed output.
    pub preserve_metadata: bool,
    /// Path of the exported metadata sidecar, set during commit when
    /// preservation was requested and the export succeeded.
    pub exported_metadata: Option<PathBuf>,
    /// Fill color for pad and rotate: a name, `#RRGGBB`, or `#RRGGBBAA`.
    /// Passed through to the engine verbatim.
    pub background_color: String,
    /// Video codec override, emitted as `c:v` when set.
    pub codec: Option<String>,
    /// First geometry violation recorded by a builder, fatal at commit.
    pub violation: Option<GeometryViolation>,
}

impl OutputSpec {
    pub fn new() -> Self {
        Self {
            path: PathBuf::new(),
            filters: Vec::new(),
            args: Vec::new(),
            quality: 0,
            loop_count: 0,
            format: None,
            preserve_metadata: false,
            exported_metadata: None,
            background_color: "black".to_string(),
            codec: None,
            violation: None,
        }
    }

    pub fn push_filter(&mut self, name: impl Into<String>, args: impl IntoIterator<Item = String>) {
        self.filters.push(Filter::new(name, args));
    }

    pub fn push_arg(&mut self, key: impl Into<String>, value: impl ToString) {
        self.args.push((key.into(), value.to_string()));
    }

    /// Set the normalized quality, clamped to at most 100. Zero means
    /// "not configured" and suppresses every quality argument.
    pub fn set_quality(&mut self, quality: u32) {
        self.quality = quality.min(100);
    }

    /// Record a geometry violation. The first one wins — it names the call
    /// that poisoned the chain.
    pub fn record_violation(&mut self, violation: GeometryViolation) {
        self.violation.get_or_insert(violation);
    }
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_renders_positional_args() {
        let f = Filter::new("scale", ["300".to_string(), "225".to_string()]);
        assert_eq!(f.render(), "scale=300:225");
    }

    #[test]
    fn filter_without_args_renders_bare() {
        let f = Filter::new("vflip", []);
        assert_eq!(f.render(), "vflip");
    }

    #[test]
    fn filters_keep_append_order() {
        let mut spec = OutputSpec::new();
        spec.push_filter("scale", ["10".to_string(), "10".to_string()]);
        spec.push_filter("vflip", []);
        spec.push_filter("scale", ["20".to_string(), "20".to_string()]);

        let rendered: Vec<String> = spec.filters.iter().map(Filter::render).collect();
        assert_eq!(rendered, ["scale=10:10", "vflip", "scale=20:20"]);
    }

    #[test]
    fn quality_clamps_to_100() {
        let mut spec = OutputSpec::new();
        spec.set_quality(250);
        assert_eq!(spec.quality, 100);

        spec.set_quality(0);
        assert_eq!(spec.quality, 0, "zero stays unset");
    }

    #[test]
    fn default_background_is_black() {
        assert_eq!(OutputSpec::new().background_color, "black");
    }

    #[test]
    fn first_violation_wins() {
        let mut spec = OutputSpec::new();
        let crop = GeometryViolation::CropExceedsSource {
            w: 800,
            h: 800,
            current_w: 431,
            current_h: 324,
        };
        let pad = GeometryViolation::PadShrinksSource {
            w: 100,
            h: 100,
            current_w: 431,
            current_h: 324,
        };
        spec.record_violation(crop);
        spec.record_violation(pad);
        assert_eq!(spec.violation, Some(crop));
    }
}

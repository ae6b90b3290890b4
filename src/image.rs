//! The fluent transformation session.
//!
//! An [`Image`] is one in-flight transformation: opening a source probes it
//! once, every chained method mutates the owned [`OutputSpec`] and returns
//! the same handle, and nothing touches a process again until
//! [`write`](Image::write) compiles the spec into a single engine run.
//!
//! Tracked vs native dimensions: [`width`](Image::width) and
//! [`height`](Image::height) follow the geometric operations as they are
//! appended and are what later operations calculate against; they only
//! become real pixels at commit. [`native_width`](Image::native_width) and
//! [`native_height`](Image::native_height) are the probed source values.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use thiserror::Error;

use crate::commit;
use crate::commit::WriteError;
use crate::config::Toolchain;
use crate::executor::{Executor, SystemExecutor};
use crate::format::ImageFormat;
use crate::geometry::{self, Anchor, Fit};
use crate::probe::{self, ProbeError, StreamInfo};
use crate::spec::{GeometryViolation, OutputSpec};

#[derive(Error, Debug)]
pub enum OpenError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One in-flight transformation session.
pub struct Image {
    pub(crate) source: PathBuf,
    /// Guard for byte-backed sessions; deletes the scratch source on drop.
    _scratch: Option<TempPath>,
    stream: StreamInfo,
    width: u32,
    height: u32,
    pub(crate) spec: OutputSpec,
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) tools: Toolchain,
}

impl Image {
    /// Open and probe a source file with the system executor and default
    /// toolchain.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        Self::open_with(path, Arc::new(SystemExecutor::new()), Toolchain::default())
    }

    /// Open and probe a source file with an explicit executor and toolchain.
    pub fn open_with(
        path: impl AsRef<Path>,
        executor: Arc<dyn Executor>,
        tools: Toolchain,
    ) -> Result<Self, OpenError> {
        let source = path.as_ref().to_path_buf();
        let stream = probe::probe(executor.as_ref(), &tools, &source)?;

        let mut spec = OutputSpec::new();
        // Normalize to RGBA before any transform; strip container metadata by
        // default (preservation re-applies tags after commit).
        spec.push_filter("format", ["rgba".to_string()]);
        spec.push_arg("map_metadata", "-1");

        Ok(Self {
            source,
            _scratch: None,
            width: stream.width,
            height: stream.height,
            stream,
            spec,
            executor,
            tools,
        })
    }

    /// Materialize a session from in-memory bytes.
    ///
    /// The payload's type is sniffed to give the scratch file a usable
    /// suffix; the file itself lives exactly as long as the session.
    pub fn from_bytes(data: &[u8]) -> Result<Self, OpenError> {
        Self::from_bytes_with(data, Arc::new(SystemExecutor::new()), Toolchain::default())
    }

    /// [`from_bytes`](Self::from_bytes) with an explicit executor and
    /// toolchain.
    pub fn from_bytes_with(
        data: &[u8],
        executor: Arc<dyn Executor>,
        tools: Toolchain,
    ) -> Result<Self, OpenError> {
        let extension = infer::get(data)
            .map(|kind| kind.extension())
            .unwrap_or("bin");

        let mut scratch = tempfile::Builder::new()
            .prefix("darkroom-src-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        std::io::Write::write_all(scratch.as_file_mut(), data)?;
        let scratch = scratch.into_temp_path();

        let mut image = Self::open_with(&scratch, executor, tools)?;
        image._scratch = Some(scratch);
        Ok(image)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Tracked width after the operations appended so far.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Tracked height after the operations appended so far.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Probed source width.
    pub fn native_width(&self) -> u32 {
        self.stream.width
    }

    /// Probed source height.
    pub fn native_height(&self) -> u32 {
        self.stream.height
    }

    /// Probed frame count; zero for static images.
    pub fn frames(&self) -> u32 {
        self.stream.frames()
    }

    /// Aspect ratio (w / h) of the tracked dimensions.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Path of the source being transformed.
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// The accumulated output specification.
    pub fn spec(&self) -> &OutputSpec {
        &self.spec
    }

    fn set_size(&mut self, w: u32, h: u32) {
        self.width = w;
        self.height = h;
    }

    fn push_scale(&mut self, w: u32, h: u32) -> &mut Self {
        self.set_size(w, h);
        self.spec
            .push_filter("scale", [w.to_string(), h.to_string()]);
        self
    }

    // =========================================================================
    // Geometric operations
    // =========================================================================

    /// Scale to exactly `w`×`h`. A single zero dimension is derived from the
    /// other by aspect division; (0, 0) is a no-op.
    pub fn resize(&mut self, w: u32, h: u32) -> &mut Self {
        if w == 0 && h == 0 {
            return self;
        }
        let ratio = self.aspect_ratio();
        let (w, h) = if w == 0 {
            ((h as f64 * ratio) as u32, h)
        } else if h == 0 {
            (w, (w as f64 / ratio) as u32)
        } else {
            (w, h)
        };
        self.push_scale(w, h)
    }

    /// Aspect-preserving scale into (or over) a `w`×`h` box per the fit
    /// policy. A single zero dimension squares the box off from the other;
    /// (0, 0) is a no-op.
    pub fn resize_fit(&mut self, w: u32, h: u32, fit: Fit) -> &mut Self {
        if w == 0 && h == 0 {
            return self;
        }
        let (w, h) = match (w, h) {
            (0, h) => (h, h),
            (w, 0) => (w, w),
            other => other,
        };
        let (w, h) = geometry::best_fit(self.width, self.height, w, h, fit);
        self.push_scale(w, h)
    }

    /// Grow the canvas to `w`×`h` with the image at offset (`x`, `y`);
    /// exposed area is filled with the background color. A box smaller than
    /// the image in either dimension is fatal at commit — padding only
    /// grows.
    pub fn extent(&mut self, w: u32, h: u32, x: u32, y: u32) -> &mut Self {
        if w < self.width || h < self.height {
            self.spec
                .record_violation(GeometryViolation::PadShrinksSource {
                    w,
                    h,
                    current_w: self.width,
                    current_h: self.height,
                });
        }
        let color = self.spec.background_color.clone();
        self.set_size(w, h);
        self.spec.push_filter(
            "pad",
            [
                w.to_string(),
                h.to_string(),
                x.to_string(),
                y.to_string(),
                color,
            ],
        );
        self
    }

    /// [`extent`](Self::extent) with the image placed by anchor instead of
    /// explicit offsets.
    pub fn extent_anchor(&mut self, w: u32, h: u32, anchor: Anchor) -> &mut Self {
        let (x, y) = geometry::anchor_offset(w, h, self.width, self.height, anchor);
        self.extent(w, h, x, y)
    }

    /// Extract the `w`×`h` region at offset (`x`, `y`). A region larger than
    /// the image in either dimension is fatal at commit — cropping only
    /// shrinks.
    pub fn crop(&mut self, w: u32, h: u32, x: u32, y: u32) -> &mut Self {
        if w > self.width || h > self.height {
            self.spec
                .record_violation(GeometryViolation::CropExceedsSource {
                    w,
                    h,
                    current_w: self.width,
                    current_h: self.height,
                });
        }
        self.set_size(w, h);
        self.spec.push_filter(
            "crop",
            [w.to_string(), h.to_string(), x.to_string(), y.to_string()],
        );
        self
    }

    /// [`crop`](Self::crop) with the region placed by anchor instead of
    /// explicit offsets.
    pub fn crop_anchor(&mut self, w: u32, h: u32, anchor: Anchor) -> &mut Self {
        let (x, y) = geometry::anchor_offset(self.width, self.height, w, h, anchor);
        self.crop(w, h, x, y)
    }

    /// Fixed-size thumbnail that fills the box exactly: upscale-fit to cover
    /// `w`×`h`, then crop the centered overflow.
    pub fn crop_thumbnail(&mut self, w: u32, h: u32) -> &mut Self {
        self.resize_fit(w, h, Fit::Upscale)
            .crop_anchor(w, h, Anchor::Center)
    }

    /// Fixed-size thumbnail that letterboxes instead of cropping: the image
    /// is downscale-fit inside `w`×`h` and centered on a background-color
    /// canvas.
    pub fn thumbnail(&mut self, w: u32, h: u32) -> &mut Self {
        let (inner_w, inner_h) = geometry::best_pad(self.width, self.height, w, h);
        let (x, y) = geometry::anchor_offset(w, h, inner_w, inner_h, Anchor::Center);
        self.resize_fit(inner_w, inner_h, Fit::Downscale)
            .extent(w, h, x, y)
    }

    /// Rotate by `degrees`, filling exposed corners with the background
    /// color. Unbounded — the engine wraps angles outside [0, 360).
    pub fn rotate(&mut self, degrees: i32) -> &mut Self {
        let color = self.spec.background_color.clone();
        self.spec.push_filter(
            "rotate",
            [format!("a={degrees}*PI/180"), format!("fillcolor={color}")],
        );
        self
    }

    /// Mirror vertically.
    pub fn flip(&mut self) -> &mut Self {
        self.spec.push_filter("vflip", []);
        self
    }

    /// Mirror horizontally.
    pub fn flop(&mut self) -> &mut Self {
        self.spec.push_filter("hflip", []);
        self
    }

    // =========================================================================
    // Output settings
    // =========================================================================

    /// Fill color for pad and rotate: a name, `#RRGGBB`, or `#RRGGBBAA`.
    /// Applies to operations appended after this call.
    pub fn set_background_color(&mut self, color: impl Into<String>) -> &mut Self {
        self.spec.background_color = color.into();
        self
    }

    /// Animation loop count: -1 no loop, 0 infinite (default), N = N extra
    /// plays.
    pub fn set_loop(&mut self, count: i32) -> &mut Self {
        self.spec.loop_count = count;
        self
    }

    /// Normalized quality, 1 (worst) to 100 (best). Codecs with a native
    /// quality parameter receive it directly; PNG and GIF are compacted
    /// after the engine run when the matching helper tool is installed.
    pub fn set_quality(&mut self, quality: u32) -> &mut Self {
        self.spec.set_quality(quality);
        self
    }

    /// Cap the frame rate of an animated output.
    pub fn set_framerate(&mut self, fps: u32) -> &mut Self {
        self.spec.push_arg("r", fps);
        self
    }

    /// Collapse an animated source to its first frame.
    pub fn drop_frames(&mut self) -> &mut Self {
        self.spec.push_arg("vframes", 1);
        self
    }

    /// Set the output container explicitly instead of inferring it from the
    /// destination suffix. Inherently static containers force
    /// [`drop_frames`](Self::drop_frames) — they cannot carry an animation.
    pub fn set_format(&mut self, format: ImageFormat) -> &mut Self {
        if format.is_static() {
            self.drop_frames();
        }
        self.spec.format = Some(format);
        self
    }

    /// Override the engine's codec choice for the resolved container.
    pub fn set_codec(&mut self, codec: impl Into<String>) -> &mut Self {
        self.spec.codec = Some(codec.into());
        self
    }

    /// Re-apply the source's metadata onto the committed output. The tags
    /// may contain GPS positions or other sensitive data — opt-in only.
    pub fn preserve_metadata(&mut self) -> &mut Self {
        self.spec.preserve_metadata = true;
        self
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Compile the accumulated specification and run the engine once.
    ///
    /// An empty destination means "overwrite the source in place"; writing
    /// to the session's own source path routes the engine through a
    /// temporary target and an atomic rename.
    pub fn write(&mut self, dest: impl AsRef<Path>) -> Result<(), WriteError> {
        commit::commit(self, dest.as_ref())
    }

    /// Commit onto the source path itself.
    pub fn overwrite(&mut self) -> Result<(), WriteError> {
        commit::commit(self, Path::new(""))
    }
}

//! # Darkroom
//!
//! A fluent, FFmpeg-backed image transformation pipeline. Open a source,
//! chain operations, commit once:
//!
//! ```no_run
//! use darkroom::Image;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! Image::open("photo.jpg")?
//!     .crop_thumbnail(300, 300)
//!     .set_quality(85)
//!     .write("thumb.webp")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture: Build, Then Commit
//!
//! Nothing executes until `write`. Every chained call appends to an
//! in-memory [`OutputSpec`]; the commit pipeline then compiles the spec into
//! a single engine invocation plus pre/post steps:
//!
//! ```text
//! 1. Build     chained calls  →  OutputSpec     (pure geometry, no I/O)
//! 2. Resolve   spec           →  format/quality (suffix table, native ranges)
//! 3. Execute   spec           →  one ffmpeg run (staged target if in-place)
//! 4. Post      best-effort    →  pngquant/gifsicle/exiftool
//! ```
//!
//! This separation exists for three reasons:
//!
//! - **Exactness**: geometry is computed against tracked dimensions, so the
//!   full chain is known — and inspectable — before a process runs.
//! - **Failure isolation**: fatal errors (bad geometry, unresolved format,
//!   engine failure) abort cleanly before or at the single execution point;
//!   optional helpers degrade to warnings and never break a commit.
//! - **Testability**: the pipeline is written against a narrow [`Executor`]
//!   seam, so unit tests assert the exact assembled invocations without
//!   launching a binary.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Pure fit/pad/anchor math — no I/O |
//! | [`format`] | Container formats, suffix table, native quality ranges |
//! | [`spec`] | The accumulating output specification |
//! | [`image`] | The fluent session handle and its builder methods |
//! | [`commit`] | Resolve → stage → execute → rename → post-process |
//! | [`probe`] | Source stream probing (dimensions, frame count) |
//! | [`executor`] | External process seam: system executor + capability probe |
//! | [`metadata`] | Tag export/import through the external metadata tool |
//! | [`config`] | Toolchain program names and invocation deadline |
//!
//! # Design Decisions
//!
//! ## Delegated Pixels (No In-Process Decoding)
//!
//! All decode, filter, and encode work is delegated to the system FFmpeg;
//! probing to ffprobe; metadata to exiftool; PNG/GIF compaction to pngquant
//! and gifsicle. The crate owns what those tools cannot: the geometry math,
//! the ordering rules of the specification, and the commit state machine.
//! There is no pixel buffer anywhere in this codebase.
//!
//! ## Same-Path Safety
//!
//! Writing a session back onto its own source would ask the engine to read
//! and write one path simultaneously. The commit pipeline detects this,
//! routes the engine to a uniquely named staging file next to the
//! destination, and atomically renames it into place after a successful
//! run. A failed run leaves the source byte-for-byte untouched.
//!
//! ## Best-Effort Post-Processing
//!
//! PNG and GIF have no native quality parameter, so quality for them is
//! applied by optional helper tools after the engine run. Helpers are
//! capability-probed once; a missing or failing helper logs a warning and
//! the commit still succeeds. The same policy covers metadata preservation.
//!
//! ## Palette-Limited Animation
//!
//! A naive GIF encode quantizes each frame separately, destroying
//! transparency and color stability. The pipeline wraps the filter chain in
//! a split/palettegen/paletteuse graph so every frame shares one palette.

pub mod commit;
pub mod config;
pub mod executor;
pub mod format;
pub mod geometry;
pub mod image;
pub mod metadata;
pub mod probe;
pub mod spec;

pub use commit::WriteError;
pub use config::{ConfigError, Toolchain};
pub use executor::{Capability, ExecError, ExecOutput, Executor, Invocation, SystemExecutor};
pub use format::{ImageFormat, NativeQuality, quality_factor};
pub use geometry::{Anchor, Fit};
pub use image::{Image, OpenError};
pub use metadata::MetadataError;
pub use probe::{ProbeError, StreamInfo};
pub use spec::{Filter, GeometryViolation, OutputSpec};

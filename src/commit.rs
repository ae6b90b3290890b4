//! The commit pipeline.
//!
//! `write` compiles the accumulated [`OutputSpec`](crate::spec::OutputSpec)
//! into one engine invocation, in stages:
//!
//! 1. **Resolve** — destination (empty ⇒ in-place), format (explicit or by
//!    suffix), native quality argument, loop argument, codec override. Any
//!    geometry violation recorded by the builders is fatal here, before a
//!    single process runs.
//! 2. **Prepare** — a destination equal to the source routes the engine to
//!    a uniquely named staging file next to it (the engine must never read
//!    and write the same path); requested metadata is exported to a scoped
//!    sidecar.
//! 3. **Execute** — one engine run with the ordered filter chain and
//!    argument set. Palette-limited animation (GIF) wraps the chain in a
//!    split/palettegen/paletteuse graph. Non-zero exit surfaces the captured
//!    diagnostics verbatim.
//! 4. **Finalize** — the staged file is atomically renamed onto the
//!    destination; rename failure is terminal.
//! 5. **Post-process** — best-effort only: PNG/GIF quality compaction via
//!    the optional helper tools, metadata re-import. Failures here are
//!    logged warnings, never errors.

use std::path::Path;
use tempfile::TempPath;
use thiserror::Error;
use tracing::warn;

use crate::executor::{Capability, ExecError, Invocation};
use crate::format::{ImageFormat, quality_factor};
use crate::image::Image;
use crate::metadata;
use crate::spec::{Filter, GeometryViolation};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("no image format: set one explicitly or write to a recognized suffix")]
    UnresolvedFormat,
    #[error(transparent)]
    Geometry(#[from] GeometryViolation),
    #[error("engine failed: {stderr}")]
    Engine { stderr: String },
    #[error("failed to move staged output into place: {0}")]
    Rename(std::io::Error),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn commit(image: &mut Image, dest: &Path) -> Result<(), WriteError> {
    // Empty destination means "overwrite the source in place".
    let dest = if dest.as_os_str().is_empty() {
        image.source.clone()
    } else {
        dest.to_path_buf()
    };
    let same_path = dest == image.source;
    image.spec.path = dest.clone();

    // A poisoned chain fails before any side effect.
    if let Some(violation) = image.spec.violation {
        return Err(violation.into());
    }

    let format = resolve_format(image, &dest)?;
    build_output_args(image, format);

    let sidecar = export_metadata(image);

    let staged: Option<TempPath> = if same_path {
        Some(stage_target(&dest, format)?)
    } else {
        None
    };
    let target: &Path = staged.as_deref().unwrap_or(&dest);

    let invocation = engine_invocation(image, format, target);
    let output = image.executor.run(&invocation)?;
    if !output.success {
        return Err(WriteError::Engine {
            stderr: output.stderr_text(),
        });
    }

    if let Some(staged) = staged {
        staged.persist(&dest).map_err(|e| WriteError::Rename(e.error))?;
    }

    compact_quality(image, format, &dest);
    reapply_metadata(image, sidecar, &dest);
    Ok(())
}

/// Explicit format wins; otherwise the resolved destination's suffix decides.
fn resolve_format(image: &mut Image, dest: &Path) -> Result<ImageFormat, WriteError> {
    let format = image
        .spec
        .format
        .or_else(|| ImageFormat::from_path(dest))
        .ok_or(WriteError::UnresolvedFormat)?;
    image.spec.format = Some(format);
    Ok(format)
}

/// Append the commit-time engine arguments: native quality, loop count, and
/// the codec override.
fn build_output_args(image: &mut Image, format: ImageFormat) {
    if image.spec.quality > 0 {
        if let Some(native) = format.native_quality() {
            let value = native.map(image.spec.quality);
            image.spec.push_arg(native.arg, value);
        }
    }

    image
        .spec
        .push_arg(format.loop_arg(), image.spec.loop_count);

    if let Some(codec) = image.spec.codec.clone() {
        image.spec.push_arg("c:v", codec);
    }
}

/// Export the source's tags to a scoped sidecar. Best-effort: any failure
/// logs a warning and preservation is skipped.
fn export_metadata(image: &mut Image) -> Option<TempPath> {
    if !image.spec.preserve_metadata {
        return None;
    }

    let tool = image.tools.exiftool.clone();
    if image.executor.capability(&tool) == Capability::Unavailable {
        warn!(tool = %tool, "metadata tool unavailable, tags will not be preserved");
        return None;
    }

    match metadata::export_tags(image.executor.as_ref(), &image.tools, &image.source) {
        Ok(sidecar) => {
            image.spec.exported_metadata = Some(sidecar.to_path_buf());
            Some(sidecar)
        }
        Err(err) => {
            warn!(error = %err, "metadata export failed, tags will not be preserved");
            None
        }
    }
}

/// Allocate the staging file for a same-path commit.
///
/// Staged next to the destination so the final rename stays on one
/// filesystem and is atomic.
fn stage_target(dest: &Path, format: ImageFormat) -> Result<TempPath, WriteError> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let staged = tempfile::Builder::new()
        .prefix(".darkroom-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(dir)?
        .into_temp_path();
    Ok(staged)
}

/// Assemble the single engine invocation.
fn engine_invocation(image: &Image, format: ImageFormat, target: &Path) -> Invocation {
    let spec = &image.spec;
    let mut args: Vec<String> = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        image.source.to_string_lossy().into_owned(),
    ];

    let chain: String = spec
        .filters
        .iter()
        .map(Filter::render)
        .collect::<Vec<_>>()
        .join(",");

    if format.is_palette_animated() {
        // A naive per-frame encode quantizes each frame separately and loses
        // transparency; a shared palette pass keeps fidelity.
        args.push("-filter_complex".to_string());
        args.push(format!(
            "[0:v]{chain},split[s0][s1];[s1]palettegen[p];[s0][p]paletteuse"
        ));
    } else if !chain.is_empty() {
        args.push("-vf".to_string());
        args.push(chain);
    }

    for (key, value) in &spec.args {
        args.push(format!("-{key}"));
        args.push(value.clone());
    }

    args.push(target.to_string_lossy().into_owned());

    Invocation::new(&image.tools.ffmpeg, args).with_timeout(image.tools.timeout())
}

/// Compact formats without a native quality knob through their helper tool.
/// Best-effort: a missing or failing helper logs a warning and the commit
/// still counts as successful.
fn compact_quality(image: &Image, format: ImageFormat, dest: &Path) {
    if image.spec.quality == 0 {
        return;
    }
    let quality = quality_factor(0, 100, image.spec.quality, false);
    let dest_arg = dest.to_string_lossy().into_owned();

    let (tool, args) = match format {
        ImageFormat::Png => (
            image.tools.pngquant.clone(),
            vec![
                "--quality".to_string(),
                format!("0-{quality}"),
                "-f".to_string(),
                dest_arg.clone(),
                "-o".to_string(),
                dest_arg,
            ],
        ),
        ImageFormat::Gif => (
            image.tools.gifsicle.clone(),
            vec![
                "-O3".to_string(),
                format!("--lossy={quality}"),
                dest_arg.clone(),
                "-o".to_string(),
                dest_arg,
            ],
        ),
        _ => return,
    };

    if image.executor.capability(&tool) == Capability::Unavailable {
        warn!(tool = %tool, "quality helper unavailable, output keeps engine defaults");
        return;
    }

    let invocation = Invocation::new(&tool, args).with_timeout(image.tools.timeout());
    match image.executor.run(&invocation) {
        Ok(output) if output.success => {}
        Ok(output) => {
            warn!(tool = %tool, stderr = %output.stderr_text(), "quality helper failed")
        }
        Err(err) => warn!(tool = %tool, error = %err, "quality helper did not run"),
    }
}

/// Re-import exported tags onto the committed output. Best-effort.
fn reapply_metadata(image: &Image, sidecar: Option<TempPath>, dest: &Path) {
    let Some(sidecar) = sidecar else { return };
    if let Err(err) =
        metadata::import_tags(image.executor.as_ref(), &image.tools, &sidecar, dest)
    {
        warn!(error = %err, "metadata re-import failed, output keeps stripped tags");
    }
}

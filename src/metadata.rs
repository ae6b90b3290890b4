//! Metadata preservation via the external tag tool.
//!
//! When a session asks for metadata preservation, the commit pipeline
//! exports every tag of the source as a JSON document *before* the engine
//! runs (the engine strips containers clean), then re-imports the document
//! onto the committed output. The exported record's originating-file field
//! is neutralized to `*` so the tool will apply it to any path.
//!
//! Both halves are best-effort from the pipeline's point of view: the
//! errors here never cross the commit boundary — the caller logs them and
//! moves on. The tag payload may contain GPS positions and device serials;
//! preservation is opt-in for that reason.

use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use thiserror::Error;

use crate::config::Toolchain;
use crate::executor::{ExecError, Executor, Invocation};

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("tag tool error: {0}")]
    Exec(#[from] ExecError),
    #[error("tag tool failed: {0}")]
    Failed(String),
    #[error("malformed tag document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("tag document was empty")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Export all tags of `source` into a scoped JSON sidecar.
///
/// The returned guard deletes the sidecar when dropped; the commit pipeline
/// keeps it alive exactly as long as the re-import needs it.
pub fn export_tags(
    executor: &dyn Executor,
    tools: &Toolchain,
    source: &Path,
) -> Result<TempPath, MetadataError> {
    let invocation = Invocation::new(
        &tools.exiftool,
        [
            "-json".to_string(),
            source.to_string_lossy().into_owned(),
        ],
    )
    .with_timeout(tools.timeout());

    let output = executor.run(&invocation)?;
    if !output.success {
        return Err(MetadataError::Failed(output.stderr_text()));
    }

    let mut records: Vec<serde_json::Map<String, Value>> =
        serde_json::from_slice(&output.stdout)?;
    let first = records.first_mut().ok_or(MetadataError::Empty)?;
    // `*` lets the tool apply the record to any file, not just the probed one
    first.insert("SourceFile".to_string(), Value::String("*".to_string()));

    let mut sidecar = tempfile::Builder::new()
        .prefix("darkroom-tags-")
        .suffix(".json")
        .tempfile()?;
    serde_json::to_writer(sidecar.as_file_mut(), &records)?;
    sidecar.as_file_mut().flush()?;
    Ok(sidecar.into_temp_path())
}

/// Re-import an exported tag document onto the committed output.
pub fn import_tags(
    executor: &dyn Executor,
    tools: &Toolchain,
    sidecar: &Path,
    dest: &Path,
) -> Result<(), MetadataError> {
    let invocation = Invocation::new(
        &tools.exiftool,
        [
            "-overwrite_original".to_string(),
            format!("-json={}", sidecar.display()),
            dest.to_string_lossy().into_owned(),
        ],
    )
    .with_timeout(tools.timeout());

    let output = executor.run(&invocation)?;
    if !output.success {
        return Err(MetadataError::Failed(output.stderr_text()));
    }
    Ok(())
}

//! Source stream probing.
//!
//! One probe per session, at construction: the probe program is asked for a
//! JSON stream report, and the first stream must carry positive dimensions
//! or the session is refused. The frame-count field is parsed leniently —
//! probes report it as a string, and absent or non-numeric values mean a
//! static image.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::config::Toolchain;
use crate::executor::{ExecError, Executor, Invocation};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe error: {0}")]
    Exec(#[from] ExecError),
    #[error("probe failed: {0}")]
    Failed(String),
    #[error("malformed probe report: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no valid stream found")]
    NoUsableStream,
}

/// The first usable stream of a probed source.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Raw frame-count field; probes report it as a string.
    #[serde(default)]
    pub nb_frames: Option<String>,
}

impl StreamInfo {
    /// Frame count, zero for static images or unparseable reports.
    pub fn frames(&self) -> u32 {
        self.nb_frames
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<StreamInfo>,
}

/// Probe a source and return its first stream.
///
/// Fails unless the report carries at least one stream with positive width
/// and height.
pub fn probe(
    executor: &dyn Executor,
    tools: &Toolchain,
    path: &Path,
) -> Result<StreamInfo, ProbeError> {
    let invocation = Invocation::new(
        &tools.ffprobe,
        [
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_streams".to_string(),
            path.to_string_lossy().into_owned(),
        ],
    )
    .with_timeout(tools.timeout());

    let output = executor.run(&invocation)?;
    if !output.success {
        return Err(ProbeError::Failed(output.stderr_text()));
    }

    let report: ProbeReport = serde_json::from_slice(&output.stdout)?;
    let stream = report
        .streams
        .into_iter()
        .next()
        .ok_or(ProbeError::NoUsableStream)?;

    if stream.width == 0 || stream.height == 0 {
        return Err(ProbeError::NoUsableStream);
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::{MockExecutor, MockResponse};

    fn report(width: u32, height: u32, nb_frames: Option<&str>) -> String {
        let frames = nb_frames
            .map(|f| format!(", \"nb_frames\": \"{f}\""))
            .unwrap_or_default();
        format!("{{\"streams\": [{{\"width\": {width}, \"height\": {height}{frames}}}]}}")
    }

    #[test]
    fn probe_parses_first_stream() {
        let executor = MockExecutor::new();
        executor.push(MockResponse::ok_with_stdout(report(431, 324, None)));

        let stream = probe(&executor, &Toolchain::default(), Path::new("in.png")).unwrap();
        assert_eq!((stream.width, stream.height), (431, 324));
        assert_eq!(stream.frames(), 0);
    }

    #[test]
    fn probe_invokes_configured_program_with_json_output() {
        let executor = MockExecutor::new();
        executor.push(MockResponse::ok_with_stdout(report(10, 10, None)));

        let tools = Toolchain {
            ffprobe: "/opt/ffprobe".to_string(),
            ..Toolchain::default()
        };
        probe(&executor, &tools, Path::new("in.png")).unwrap();

        let recorded = executor.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].program, "/opt/ffprobe");
        assert!(recorded[0].args.contains(&"-show_streams".to_string()));
        assert_eq!(recorded[0].args.last().unwrap(), "in.png");
    }

    #[test]
    fn probe_rejects_empty_stream_list() {
        let executor = MockExecutor::new();
        executor.push(MockResponse::ok_with_stdout("{\"streams\": []}"));

        let result = probe(&executor, &Toolchain::default(), Path::new("in.png"));
        assert!(matches!(result, Err(ProbeError::NoUsableStream)));
    }

    #[test]
    fn probe_rejects_zero_dimensions() {
        let executor = MockExecutor::new();
        executor.push(MockResponse::ok_with_stdout(report(0, 324, None)));

        let result = probe(&executor, &Toolchain::default(), Path::new("in.png"));
        assert!(matches!(result, Err(ProbeError::NoUsableStream)));
    }

    #[test]
    fn probe_surfaces_tool_failure() {
        let executor = MockExecutor::new();
        executor.push(MockResponse::failure("in.png: No such file or directory"));

        let result = probe(&executor, &Toolchain::default(), Path::new("in.png"));
        match result {
            Err(ProbeError::Failed(stderr)) => assert!(stderr.contains("No such file")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn frames_parses_numeric_field() {
        let executor = MockExecutor::new();
        executor.push(MockResponse::ok_with_stdout(report(96, 96, Some("60"))));

        let stream = probe(&executor, &Toolchain::default(), Path::new("in.gif")).unwrap();
        assert_eq!(stream.frames(), 60);
    }

    #[test]
    fn frames_treats_non_numeric_as_static() {
        let executor = MockExecutor::new();
        executor.push(MockResponse::ok_with_stdout(report(96, 96, Some("N/A"))));

        let stream = probe(&executor, &Toolchain::default(), Path::new("in.gif")).unwrap();
        assert_eq!(stream.frames(), 0);
    }
}

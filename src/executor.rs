//! External process execution seam.
//!
//! The [`Executor`] trait is the only place the crate touches a real
//! process: a program name, ordered arguments, and an optional deadline go
//! in; exit status and captured output come out. The commit pipeline and the
//! probe are written against the trait, so tests drive them with the
//! recording [`tests::MockExecutor`] and never launch a binary.
//!
//! The production implementation is [`SystemExecutor`] (std::process).
//! Optional helper tools are capability-probed once per program, so the
//! best-effort policy is an explicit `Available | Unavailable` decision
//! instead of an exec failure interpreted after the fact.

use std::collections::HashMap;
use std::io;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to launch {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result of probing for an optional helper program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Available,
    Unavailable,
}

/// One external command: program, ordered arguments, optional deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Captured outcome of a finished invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecOutput {
    /// Diagnostic text, surfaced verbatim in engine failures.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Trait for launching external programs.
pub trait Executor: Send + Sync {
    /// Run to completion, capturing stdout and stderr.
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput, ExecError>;

    /// Whether a program can be launched at all. Checked once per program
    /// for the optional post-processing helpers.
    fn capability(&self, program: &str) -> Capability;
}

/// Production executor backed by std::process.
#[derive(Default)]
pub struct SystemExecutor {
    capabilities: Mutex<HashMap<String, Capability>>,
}

impl SystemExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn run_with_deadline(
        &self,
        invocation: &Invocation,
        timeout: Duration,
    ) -> Result<ExecOutput, ExecError> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        // A child that fills a pipe before exiting stalls the poll; the
        // deadline still fires and kills it.
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait()? {
                Some(_) => break,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExecError::TimedOut {
                        program: invocation.program.clone(),
                        timeout,
                    });
                }
                None => std::thread::sleep(Duration::from_millis(20)),
            }
        }

        let output = child.wait_with_output()?;
        Ok(ExecOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

impl Executor for SystemExecutor {
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput, ExecError> {
        if let Some(timeout) = invocation.timeout {
            return self.run_with_deadline(invocation, timeout);
        }

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(ExecOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn capability(&self, program: &str) -> Capability {
        let mut cache = self.capabilities.lock().unwrap();
        if let Some(cap) = cache.get(program) {
            return *cap;
        }

        // Launching is the signal; the exit status is not. `-version` keeps
        // well-behaved tools from blocking on stdin.
        let cap = match Command::new(program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => Capability::Available,
            Err(_) => Capability::Unavailable,
        };
        cache.insert(program.to_string(), cap);
        cap
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Canned outcome for one mock run.
    #[derive(Debug, Clone)]
    pub struct MockResponse {
        pub success: bool,
        pub stdout: Vec<u8>,
        pub stderr: Vec<u8>,
    }

    impl MockResponse {
        pub fn ok() -> Self {
            Self {
                success: true,
                stdout: Vec::new(),
                stderr: Vec::new(),
            }
        }

        pub fn ok_with_stdout(stdout: impl Into<Vec<u8>>) -> Self {
            Self {
                success: true,
                stdout: stdout.into(),
                stderr: Vec::new(),
            }
        }

        pub fn failure(stderr: impl Into<Vec<u8>>) -> Self {
            Self {
                success: false,
                stdout: Vec::new(),
                stderr: stderr.into(),
            }
        }
    }

    /// Mock executor that records invocations without launching anything.
    /// Uses Mutex (not RefCell) so it is Sync like the production executor.
    ///
    /// Responses are consumed in FIFO order, one per `run`; when the queue
    /// is empty the run succeeds with empty output, so tests only stage the
    /// calls they care about.
    #[derive(Default)]
    pub struct MockExecutor {
        responses: Mutex<VecDeque<MockResponse>>,
        invocations: Mutex<Vec<Invocation>>,
        unavailable: Mutex<Vec<String>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, response: MockResponse) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn mark_unavailable(&self, program: &str) {
            self.unavailable.lock().unwrap().push(program.to_string());
        }

        pub fn recorded(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    impl Executor for MockExecutor {
        fn run(&self, invocation: &Invocation) -> Result<ExecOutput, ExecError> {
            self.invocations.lock().unwrap().push(invocation.clone());

            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(MockResponse::ok);

            Ok(ExecOutput {
                success: response.success,
                stdout: response.stdout,
                stderr: response.stderr,
            })
        }

        fn capability(&self, program: &str) -> Capability {
            if self.unavailable.lock().unwrap().iter().any(|p| p == program) {
                Capability::Unavailable
            } else {
                Capability::Available
            }
        }
    }

    #[test]
    fn mock_records_invocations_in_order() {
        let executor = MockExecutor::new();

        executor
            .run(&Invocation::new("ffmpeg", ["-version".to_string()]))
            .unwrap();
        executor
            .run(&Invocation::new("exiftool", ["-ver".to_string()]))
            .unwrap();

        let recorded = executor.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].program, "ffmpeg");
        assert_eq!(recorded[1].program, "exiftool");
    }

    #[test]
    fn mock_consumes_responses_fifo() {
        let executor = MockExecutor::new();
        executor.push(MockResponse::ok_with_stdout("first"));
        executor.push(MockResponse::failure("second failed"));

        let inv = Invocation::new("tool", []);
        let first = executor.run(&inv).unwrap();
        assert!(first.success);
        assert_eq!(first.stdout, b"first");

        let second = executor.run(&inv).unwrap();
        assert!(!second.success);
        assert_eq!(second.stderr_text(), "second failed");

        // Exhausted queue defaults to success
        assert!(executor.run(&inv).unwrap().success);
    }

    #[test]
    fn mock_capability_honors_unavailable_list() {
        let executor = MockExecutor::new();
        executor.mark_unavailable("pngquant");

        assert_eq!(executor.capability("pngquant"), Capability::Unavailable);
        assert_eq!(executor.capability("gifsicle"), Capability::Available);
    }

    #[test]
    fn system_executor_reports_missing_program() {
        let executor = SystemExecutor::new();
        assert_eq!(
            executor.capability("definitely-not-a-real-binary-4242"),
            Capability::Unavailable
        );
    }

    #[test]
    fn invocation_carries_timeout() {
        let inv = Invocation::new("ffmpeg", []).with_timeout(Some(Duration::from_secs(30)));
        assert_eq!(inv.timeout, Some(Duration::from_secs(30)));
    }
}

//! External process execution
//!
//! The media tools (ffmpeg, ffprobe) are reached only through [`ProcessRunner`]
//! so the inspector and remuxer can be exercised with a scripted runner.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Captured result of a finished process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Trimmed stderr, capped so diagnostics stay loggable.
    pub fn stderr_excerpt(&self) -> String {
        const MAX_STDERR_CHARS: usize = 2000;
        let text = String::from_utf8_lossy(&self.stderr);
        let text = text.trim();
        if text.chars().count() > MAX_STDERR_CHARS {
            let tail: String = text
                .chars()
                .rev()
                .take(MAX_STDERR_CHARS)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("...{}", tail)
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} did not finish within {} seconds", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Runs an external program to completion.
///
/// Implementations must enforce `timeout` and must not leave the child
/// running once the returned future completes or is dropped.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    #[tracing::instrument(skip(self, args), fields(
        process.executable.name = %program,
        timeout_secs = timeout.as_secs()
    ))]
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let start = std::time::Instant::now();

        // Dropping this future (e.g. a cancelled request) kills the child.
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(pipe) = stdout.as_mut() {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, io::Error>(buf)
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr.as_mut() {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, io::Error>(buf)
        };

        let waited = tokio::time::timeout(timeout, async {
            tokio::try_join!(child.wait(), read_stdout, read_stderr)
        })
        .await;

        match waited {
            Ok(Ok((status, stdout, stderr))) => {
                tracing::debug!(
                    exit_code = ?status.code(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Process finished"
                );
                Ok(ProcessOutput {
                    stdout,
                    stderr,
                    exit_code: status.code(),
                })
            }
            Ok(Err(source)) => Err(ProcessError::Io {
                program: program.to_string(),
                source,
            }),
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Process timed out, killing"
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out process");
                }
                Err(ProcessError::Timeout {
                    program: program.to_string(),
                    timeout,
                })
            }
        }
    }
}

/// Reject executable paths carrying shell metacharacters or traversal.
pub fn validate_executable(path: &str) -> anyhow::Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.is_empty() {
        anyhow::bail!("Executable path is empty");
    }
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        anyhow::bail!("Executable path contains dangerous characters: {}", path);
    }
    if path.contains("..") {
        anyhow::bail!("Executable path contains directory traversal: {}", path);
    }
    Ok(())
}

//! Fast-start remuxing: move the MP4 index ahead of the media data without
//! re-encoding.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tubely_core::error::TIMEOUT_REASON;
use tubely_core::{AppError, ProcessingStage};

use crate::process::{validate_executable, ProcessError, ProcessRunner};

const PROCESSED_SUFFIX: &str = ".processed";

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("ffmpeg exited with code {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl From<RemuxError> for AppError {
    fn from(err: RemuxError) -> Self {
        let stage = ProcessingStage::Remux;
        match err {
            RemuxError::Failed { exit_code, stderr } => {
                AppError::processing(stage, exit_code, format!("ffmpeg failed: {}", stderr))
            }
            RemuxError::Process(ProcessError::Timeout { .. }) => {
                AppError::processing(stage, None, TIMEOUT_REASON)
            }
            other => AppError::processing(stage, None, other.to_string()),
        }
    }
}

/// Where [`FastStartRemuxer::remux`] writes its output: `input + ".processed"`.
pub fn processed_path_for(input: &Path) -> PathBuf {
    let mut path: OsString = input.as_os_str().to_owned();
    path.push(PROCESSED_SUFFIX);
    PathBuf::from(path)
}

pub struct FastStartRemuxer {
    runner: Arc<dyn ProcessRunner>,
    ffmpeg_path: String,
    timeout: Duration,
}

impl FastStartRemuxer {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        ffmpeg_path: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let ffmpeg_path = ffmpeg_path.into();
        validate_executable(&ffmpeg_path)?;
        Ok(Self {
            runner,
            ffmpeg_path,
            timeout,
        })
    }

    fn remux_args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-v".into(), "error".into(), "-i".into()];
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-movflags",
                "faststart",
                "-map_metadata",
                "0",
                "-codec",
                "copy",
                "-f",
                "mp4",
            ]
            .iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Stream-copy `input` into `input.processed` with the moov atom first and
    /// container metadata preserved. The input is left untouched.
    ///
    /// On failure a partially written output may exist; deleting it is the
    /// caller's job.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    pub async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        let start = std::time::Instant::now();
        let output_path = processed_path_for(input);

        let output = self
            .runner
            .run(
                &self.ffmpeg_path,
                &Self::remux_args(input, &output_path),
                self.timeout,
            )
            .await?;

        if !output.success() {
            return Err(RemuxError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr_excerpt(),
            });
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            output = %output_path.display(),
            "Fast-start remux completed"
        );

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedRunner;

    fn remuxer(runner: ScriptedRunner) -> FastStartRemuxer {
        FastStartRemuxer::new(Arc::new(runner), "ffmpeg", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_processed_path() {
        assert_eq!(
            processed_path_for(Path::new("/tmp/abc.mp4")),
            PathBuf::from("/tmp/abc.mp4.processed")
        );
    }

    #[tokio::test]
    async fn test_remux_stream_copies_with_faststart() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.mp4");
        tokio::fs::write(&input, b"mp4 bytes").await.unwrap();

        let runner = ScriptedRunner::new();
        let calls = runner.calls();
        let output = remuxer(runner).remux(&input).await.unwrap();

        assert_eq!(output, processed_path_for(&input));
        assert!(output.exists());
        assert!(input.exists());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let args = &calls[0].args;
        let input_str = input.to_string_lossy().to_string();
        let output_str = output.to_string_lossy().to_string();
        assert_eq!(calls[0].program, "ffmpeg");
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == input_str));
        assert!(args.windows(2).any(|w| w[0] == "-movflags" && w[1] == "faststart"));
        assert!(args.windows(2).any(|w| w[0] == "-codec" && w[1] == "copy"));
        assert!(args.windows(2).any(|w| w[0] == "-map_metadata" && w[1] == "0"));
        assert_eq!(args.last(), Some(&output_str));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_remux_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.mp4");
        let runner = ScriptedRunner::new().remux_fails(1);
        let err = remuxer(runner).remux(&input).await.unwrap_err();
        assert!(matches!(
            err,
            RemuxError::Failed {
                exit_code: Some(1),
                ..
            }
        ));

        let app_err = AppError::from(err);
        assert!(matches!(
            app_err,
            AppError::Processing {
                stage: ProcessingStage::Remux,
                exit_code: Some(1),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_reason() {
        let runner = ScriptedRunner::new().remux_times_out();
        let err = remuxer(runner)
            .remux(Path::new("/tmp/x.mp4"))
            .await
            .unwrap_err();
        assert!(AppError::from(err).is_timeout());
    }
}

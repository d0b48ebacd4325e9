//! Stream inspection - frame dimensions via ffprobe

use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tubely_core::error::TIMEOUT_REASON;
use tubely_core::{AppError, Classification, ProcessingStage};

use crate::process::{validate_executable, ProcessError, ProcessRunner};

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;
const RATIO_TOLERANCE: f64 = 0.01;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("ffprobe exited with code {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("ffprobe output could not be parsed: {0}")]
    MalformedOutput(String),

    #[error("no video stream with width and height found")]
    NoDimensions,

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl From<ProbeError> for AppError {
    fn from(err: ProbeError) -> Self {
        let stage = ProcessingStage::Probe;
        match err {
            ProbeError::Failed { exit_code, stderr } => {
                AppError::processing(stage, exit_code, format!("ffprobe failed: {}", stderr))
            }
            ProbeError::Process(ProcessError::Timeout { .. }) => {
                AppError::processing(stage, None, TIMEOUT_REASON)
            }
            other => AppError::processing(stage, None, other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Bucket frame geometry into landscape (16:9), portrait (9:16) or other.
///
/// Only ratios within 0.01 of a target count; everything else, 4:3 and
/// square included, is `Other`.
pub fn classify(width: u32, height: u32) -> Classification {
    if width == 0 || height == 0 {
        return Classification::Other;
    }

    let ratio = f64::from(width) / f64::from(height);
    if (ratio - LANDSCAPE_RATIO).abs() < RATIO_TOLERANCE {
        Classification::Landscape
    } else if (ratio - PORTRAIT_RATIO).abs() < RATIO_TOLERANCE {
        Classification::Portrait
    } else {
        Classification::Other
    }
}

/// Reads the first video stream's dimensions with ffprobe. Read-only.
pub struct StreamInspector {
    runner: Arc<dyn ProcessRunner>,
    ffprobe_path: String,
    timeout: Duration,
}

impl StreamInspector {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        ffprobe_path: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let ffprobe_path = ffprobe_path.into();
        validate_executable(&ffprobe_path)?;
        Ok(Self {
            runner,
            ffprobe_path,
            timeout,
        })
    }

    fn probe_args(path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "json",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_owned());
        args
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn dimensions(&self, path: &Path) -> Result<(u32, u32), ProbeError> {
        let start = std::time::Instant::now();

        let output = self
            .runner
            .run(&self.ffprobe_path, &Self::probe_args(path), self.timeout)
            .await?;

        if !output.success() {
            return Err(ProbeError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr_excerpt(),
            });
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProbeError::MalformedOutput(e.to_string()))?;

        let (width, height) = probe
            .streams
            .first()
            .and_then(|s| s.width.zip(s.height))
            .filter(|(w, h)| *w > 0 && *h > 0)
            .ok_or(ProbeError::NoDimensions)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            width,
            height,
            "Video probe completed"
        );

        Ok((width, height))
    }

    pub async fn inspect(&self, path: &Path) -> Result<Classification, ProbeError> {
        let (width, height) = self.dimensions(path).await?;
        Ok(classify(width, height))
    }
}

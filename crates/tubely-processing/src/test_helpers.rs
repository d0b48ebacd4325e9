//! Test doubles for the media tools, the object store and the metadata store.
//!
//! Enabled for this crate's unit tests and, through the `test-helpers`
//! feature, for the API integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tubely_core::VideoRecord;
use tubely_db::{InMemoryVideoRepository, VideoRepository};
use tubely_storage::{Storage, StorageBackend, StorageError, StorageResult};
use uuid::Uuid;

use crate::process::{ProcessError, ProcessOutput, ProcessRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
enum ProbeScript {
    Stdout(String),
    Fail { code: i32, stderr: String },
    Timeout,
}

#[derive(Debug, Clone)]
enum RemuxScript {
    CopyInput,
    /// Writes a truncated output, then exits non-zero
    Fail { code: i32 },
    Timeout,
    /// Writes a truncated output, then never returns
    Hang,
}

/// A [`ProcessRunner`] that plays ffprobe and ffmpeg without running them.
///
/// Programs whose name contains `ffprobe` answer with scripted JSON. Anything
/// else is treated as ffmpeg: the file after `-i` is copied to the last
/// argument.
#[derive(Debug, Clone)]
pub struct ScriptedRunner {
    probe: ProbeScript,
    remux: RemuxScript,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    /// Probes report 1920x1080; remuxes succeed.
    pub fn new() -> Self {
        Self {
            probe: ProbeScript::Stdout(probe_json(1920, 1080)),
            remux: RemuxScript::CopyInput,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.probe = ProbeScript::Stdout(probe_json(width, height));
        self
    }

    pub fn probe_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.probe = ProbeScript::Stdout(stdout.into());
        self
    }

    pub fn probe_fails(mut self, code: i32, stderr: impl Into<String>) -> Self {
        self.probe = ProbeScript::Fail {
            code,
            stderr: stderr.into(),
        };
        self
    }

    pub fn probe_times_out(mut self) -> Self {
        self.probe = ProbeScript::Timeout;
        self
    }

    pub fn remux_fails(mut self, code: i32) -> Self {
        self.remux = RemuxScript::Fail { code };
        self
    }

    pub fn remux_times_out(mut self) -> Self {
        self.remux = RemuxScript::Timeout;
        self
    }

    /// The remux never finishes, like an ffmpeg stuck on a slow disk.
    pub fn remux_hangs(mut self) -> Self {
        self.remux = RemuxScript::Hang;
        self
    }

    /// Shared handle to every invocation, in order.
    pub fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        Arc::clone(&self.calls)
    }

    fn probe(&self, program: &str, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        match &self.probe {
            ProbeScript::Stdout(stdout) => Ok(ProcessOutput {
                stdout: stdout.clone().into_bytes(),
                stderr: Vec::new(),
                exit_code: Some(0),
            }),
            ProbeScript::Fail { code, stderr } => Ok(ProcessOutput {
                stdout: Vec::new(),
                stderr: stderr.clone().into_bytes(),
                exit_code: Some(*code),
            }),
            ProbeScript::Timeout => Err(ProcessError::Timeout {
                program: program.to_string(),
                timeout,
            }),
        }
    }

    async fn remux(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let io_error = |source| ProcessError::Io {
            program: program.to_string(),
            source,
        };
        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1))
            .map(PathBuf::from);
        let output = args.last().map(PathBuf::from);

        match &self.remux {
            RemuxScript::CopyInput => {
                if let (Some(input), Some(output)) = (input, output) {
                    tokio::fs::copy(&input, &output).await.map_err(io_error)?;
                }
                Ok(ProcessOutput {
                    exit_code: Some(0),
                    ..Default::default()
                })
            }
            RemuxScript::Fail { code } => {
                if let Some(output) = output {
                    tokio::fs::write(&output, b"\0\0\0\x18ftyp")
                        .await
                        .map_err(io_error)?;
                }
                Ok(ProcessOutput {
                    stdout: Vec::new(),
                    stderr: b"Invalid data found when processing input".to_vec(),
                    exit_code: Some(*code),
                })
            }
            RemuxScript::Timeout => Err(ProcessError::Timeout {
                program: program.to_string(),
                timeout,
            }),
            RemuxScript::Hang => {
                if let Some(output) = output {
                    tokio::fs::write(&output, b"\0\0\0\x18ftyp")
                        .await
                        .map_err(io_error)?;
                }
                std::future::pending().await
            }
        }
    }
}

fn probe_json(width: u32, height: u32) -> String {
    serde_json::json!({ "streams": [{ "width": width, "height": height }] }).to_string()
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                program: program.to_string(),
                args: args.clone(),
            });
        }

        if program.contains("ffprobe") {
            self.probe(program, timeout)
        } else {
            self.remux(program, &args, timeout).await
        }
    }
}

/// In-memory [`Storage`] that counts every call.
#[derive(Clone, Default)]
pub struct RecordingStorage {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    calls: Arc<AtomicUsize>,
    fail_uploads: Arc<AtomicBool>,
    fail_presign: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl RecordingStorage {
    pub const BASE_URL: &'static str = "https://tubely-test.s3.us-east-1.amazonaws.com";

    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload fails until [`set_fail_uploads`](Self::set_fail_uploads)
    /// turns it off.
    pub fn failing_uploads() -> Self {
        let storage = Self::default();
        storage.set_fail_uploads(true);
        storage
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_presign(&self, fail: bool) {
        self.fail_presign.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("scripted failure".to_string()));
        }
        self.objects
            .lock()
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .insert(
                key.to_string(),
                StoredObject {
                    data,
                    content_type: content_type.to_string(),
                },
            );
        Ok(self.object_url(key))
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn upload_file(
        &self,
        storage_key: &str,
        path: &std::path::Path,
        content_type: &str,
    ) -> StorageResult<String> {
        self.record_call();
        let data = tokio::fs::read(path).await?;
        self.put(storage_key, data, content_type)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.record_call();
        self.objects
            .lock()
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .remove(storage_key);
        Ok(())
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.record_call();
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("signer unavailable".to_string()));
        }
        Ok(format!(
            "{}?X-Amz-Expires={}",
            self.object_url(storage_key),
            expires_in.as_secs()
        ))
    }

    fn object_url(&self, storage_key: &str) -> String {
        format!("{}/{}", Self::BASE_URL, storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Wraps [`InMemoryVideoRepository`] and can be told to fail commits.
#[derive(Clone, Default)]
pub struct FlakyRepository {
    inner: InMemoryVideoRepository,
    fail_updates: Arc<AtomicBool>,
    fail_lookups: Arc<AtomicBool>,
    updates: Arc<AtomicUsize>,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Number of URL writes, failed ones included.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn count_update(&self) -> anyhow::Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset by peer");
        }
        Ok(())
    }
}

#[async_trait]
impl VideoRepository for FlakyRepository {
    async fn get_video(&self, id: Uuid) -> anyhow::Result<Option<VideoRecord>> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        self.inner.get_video(id).await
    }

    async fn set_video_url(
        &self,
        id: Uuid,
        video_url: &str,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<VideoRecord> {
        self.count_update()?;
        self.inner.set_video_url(id, video_url, updated_at).await
    }

    async fn set_thumbnail_url(
        &self,
        id: Uuid,
        thumbnail_url: &str,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<VideoRecord> {
        self.count_update()?;
        self.inner.set_thumbnail_url(id, thumbnail_url, updated_at).await
    }

    async fn create_video(&self, record: &VideoRecord) -> anyhow::Result<()> {
        self.inner.create_video(record).await
    }

    async fn list_videos_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<VideoRecord>> {
        self.inner.list_videos_for_user(user_id).await
    }

    async fn delete_video(&self, id: Uuid) -> anyhow::Result<bool> {
        self.inner.delete_video(id).await
    }
}

//! Video ingestion orchestration: authorize → materialize → remux → probe →
//! upload → commit.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use tubely_core::constants::{MAX_VIDEO_UPLOAD_BYTES, VIDEO_CONTENT_TYPE};
use tubely_core::{AppError, StorageStage, VideoRecord};
use tubely_db::VideoRepository;
use tubely_storage::{build_video_key, Storage};

use super::inspector::StreamInspector;
use super::remuxer::FastStartRemuxer;
use crate::ownership::load_owned_video;
use crate::validator::UploadValidator;

const COPY_BUFFER_BYTES: usize = 64 * 1024;
const RAW_UPLOAD_NAME: &str = "upload.mp4";

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Parent of the per-ingestion scratch directories
    pub temp_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl IngestConfig {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            max_upload_bytes: MAX_VIDEO_UPLOAD_BYTES,
        }
    }
}

/// One video upload as it arrives from the client.
pub struct UploadRequest<R> {
    pub owner_id: Uuid,
    pub video_id: Uuid,
    /// Content type declared on the upload part
    pub content_type: Option<String>,
    /// Size the client announced up front, if any
    pub declared_size: Option<u64>,
    pub body: R,
}

/// Runs the ingestion pipeline for uploaded videos.
///
/// Each call is independent. Two concurrent ingestions of the same video are
/// not serialized; both upload their own object and the later metadata commit
/// wins.
pub struct VideoIngestService {
    repository: Arc<dyn VideoRepository>,
    storage: Arc<dyn Storage>,
    remuxer: FastStartRemuxer,
    inspector: StreamInspector,
    config: IngestConfig,
}

impl VideoIngestService {
    pub fn new(
        repository: Arc<dyn VideoRepository>,
        storage: Arc<dyn Storage>,
        remuxer: FastStartRemuxer,
        inspector: StreamInspector,
        config: IngestConfig,
    ) -> Self {
        Self {
            repository,
            storage,
            remuxer,
            inspector,
            config,
        }
    }

    /// Ingest an uploaded video and return the updated record.
    ///
    /// Ownership and the declared size/type are checked before any byte is
    /// written locally. Each ingestion works in its own scratch directory,
    /// which is removed when the call returns or its future is dropped. Only
    /// the final commit touches the record, and it writes `videoURL` alone,
    /// so any earlier failure leaves the previous link in place.
    #[tracing::instrument(skip(self, request), fields(
        video_id = %request.video_id,
        owner_id = %request.owner_id
    ))]
    pub async fn ingest<R>(&self, request: UploadRequest<R>) -> Result<VideoRecord, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let start = Instant::now();
        let UploadRequest {
            owner_id,
            video_id,
            content_type,
            declared_size,
            mut body,
        } = request;

        load_owned_video(self.repository.as_ref(), video_id, owner_id).await?;

        let validator = UploadValidator::video().with_max_file_size(self.config.max_upload_bytes);
        validator.validate_content_type(content_type.as_deref())?;
        if let Some(size) = declared_size {
            validator.validate_file_size(size)?;
        }

        let scratch = self.scratch_dir().await?;
        let result = self
            .process(video_id, &validator, &mut body, scratch.path())
            .await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(
                path = %scratch_path.display(),
                error = %e,
                "Failed to remove scratch directory"
            );
        }

        match &result {
            Ok(record) => tracing::info!(
                video_url = record.video_url.as_deref().unwrap_or_default(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Video ingestion completed"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                error_type = e.error_type(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Video ingestion failed"
            ),
        }

        result
    }

    async fn scratch_dir(&self) -> Result<TempDir, AppError> {
        let local_write = |e: std::io::Error| {
            AppError::storage(
                StorageStage::LocalWrite,
                format!("Failed to create scratch directory: {}", e),
            )
        };
        tokio::fs::create_dir_all(&self.config.temp_dir)
            .await
            .map_err(local_write)?;
        tempfile::Builder::new()
            .prefix("ingest-")
            .tempdir_in(&self.config.temp_dir)
            .map_err(local_write)
    }

    async fn process<R>(
        &self,
        video_id: Uuid,
        validator: &UploadValidator,
        body: &mut R,
        scratch: &Path,
    ) -> Result<VideoRecord, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let raw_path = scratch.join(RAW_UPLOAD_NAME);
        let size_bytes = materialize(body, &raw_path, validator).await?;
        tracing::debug!(size_bytes, path = %raw_path.display(), "Upload written to disk");

        let processed_path = self.remuxer.remux(&raw_path).await?;
        let classification = self.inspector.inspect(&processed_path).await?;
        let storage_key = build_video_key(classification);

        let video_url = self
            .storage
            .upload_file(&storage_key, &processed_path, VIDEO_CONTENT_TYPE)
            .await
            .map_err(|e| {
                tracing::error!(storage_key = %storage_key, error = %e, "Video upload failed");
                AppError::storage(StorageStage::Upload, e.to_string())
            })?;

        let record = self
            .repository
            .set_video_url(video_id, &video_url, Utc::now())
            .await
            .map_err(|e| {
                tracing::error!(
                    video_id = %video_id,
                    storage_key = %storage_key,
                    orphaned_object = true,
                    error = %e,
                    "Metadata commit failed after upload; stored object is unreferenced"
                );
                AppError::storage(StorageStage::MetadataCommit, e.to_string())
            })?;

        tracing::info!(
            classification = %classification,
            storage_key = %storage_key,
            size_bytes,
            "Video stored"
        );

        Ok(record)
    }
}

/// Stream `body` into a new file at `path`, enforcing the size limit as
/// bytes arrive.
async fn materialize<R>(
    body: &mut R,
    path: &Path,
    validator: &UploadValidator,
) -> Result<u64, AppError>
where
    R: AsyncRead + Unpin + Send,
{
    let local_write =
        |e: std::io::Error| AppError::storage(StorageStage::LocalWrite, e.to_string());

    let mut file = tokio::fs::File::create(path).await.map_err(local_write)?;

    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut written: u64 = 0;
    loop {
        let n = body
            .read(&mut buf)
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
        if n == 0 {
            break;
        }
        written += n as u64;
        validator.validate_file_size(written)?;
        file.write_all(&buf[..n]).await.map_err(local_write)?;
    }

    validator.validate_received_size(written)?;
    file.flush().await.map_err(local_write)?;
    file.sync_all().await.map_err(local_write)?;
    Ok(written)
}

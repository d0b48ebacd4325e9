use std::time::Duration;
use tubely_core::{AppError, StorageStage, VideoRecord};
use tubely_storage::Storage;

/// Replace a stored object URL with a time-limited presigned link.
///
/// Records without a video, or whose URL does not point into `storage`, are
/// returned unchanged.
pub async fn sign_video(
    storage: &dyn Storage,
    record: VideoRecord,
    ttl: Duration,
) -> Result<VideoRecord, AppError> {
    let key = match record
        .video_url
        .as_deref()
        .and_then(|url| storage.key_from_url(url))
    {
        Some(key) => key,
        None => return Ok(record),
    };

    let signed = storage
        .get_presigned_url(&key, ttl)
        .await
        .map_err(|e| {
            tracing::error!(video_id = %record.id, storage_key = %key, error = %e, "Presign failed");
            AppError::storage(StorageStage::Presign, e.to_string())
        })?;

    Ok(VideoRecord {
        video_url: Some(signed),
        ..record
    })
}

pub async fn sign_videos(
    storage: &dyn Storage,
    records: Vec<VideoRecord>,
    ttl: Duration,
) -> Result<Vec<VideoRecord>, AppError> {
    let mut signed = Vec::with_capacity(records.len());
    for record in records {
        signed.push(sign_video(storage, record, ttl).await?);
    }
    Ok(signed)
}

use tubely_core::{AppError, StorageStage, VideoRecord};
use tubely_db::VideoRepository;
use uuid::Uuid;

/// Fetch a video record and require that `owner_id` owns it.
///
/// Runs before anything is read from the request body or written anywhere,
/// so a rejected caller leaves no trace.
pub async fn load_owned_video(
    repository: &dyn VideoRepository,
    video_id: Uuid,
    owner_id: Uuid,
) -> Result<VideoRecord, AppError> {
    let record = repository
        .get_video(video_id)
        .await
        .map_err(|e| {
            tracing::error!(video_id = %video_id, error = %e, "Video lookup failed");
            AppError::storage(StorageStage::MetadataLookup, e.to_string())
        })?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    if !record.is_owned_by(owner_id) {
        tracing::warn!(
            video_id = %video_id,
            owner_id = %owner_id,
            "Rejected access to a video owned by another user"
        );
        return Err(AppError::Ownership(
            "You are not the owner of this video".to_string(),
        ));
    }

    Ok(record)
}

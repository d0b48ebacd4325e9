use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tubely_core::models::CreateVideoRequest;
use tubely_core::{AppError, StorageStage, VideoRecord};
use tubely_processing::{load_owned_video, sign_video, sign_videos};
use uuid::Uuid;

const MAX_TITLE_CHARS: usize = 200;

#[utoipa::path(
    post,
    path = "/videos",
    tag = "videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Draft video created", body = VideoRecord),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    ValidatedJson(request): ValidatedJson<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoRecord>), HttpAppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()).into());
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        ))
        .into());
    }

    let record = VideoRecord::new(user.user_id, title, request.description);
    state.repository.create_video(&record).await.map_err(|e| {
        AppError::storage(StorageStage::MetadataCommit, e.to_string())
    })?;

    tracing::info!(video_id = %record.id, user_id = %user.user_id, "Draft video created");
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/videos",
    tag = "videos",
    responses(
        (status = 200, description = "Caller's videos, newest first", body = [VideoRecord]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<Vec<VideoRecord>>, HttpAppError> {
    let records = state
        .repository
        .list_videos_for_user(user.user_id)
        .await
        .map_err(|e| AppError::storage(StorageStage::MetadataLookup, e.to_string()))?;

    let signed = sign_videos(state.storage.as_ref(), records, state.presign_ttl()).await?;
    Ok(Json(signed))
}

#[utoipa::path(
    get,
    path = "/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video with a presigned videoURL", body = VideoRecord),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(video_id): Path<Uuid>,
) -> Result<Json<VideoRecord>, HttpAppError> {
    let record = load_owned_video(state.repository.as_ref(), video_id, user.user_id).await?;
    let signed = sign_video(state.storage.as_ref(), record, state.presign_ttl()).await?;
    Ok(Json(signed))
}

#[utoipa::path(
    delete,
    path = "/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(video_id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    let record = load_owned_video(state.repository.as_ref(), video_id, user.user_id).await?;

    let deleted = state
        .repository
        .delete_video(video_id)
        .await
        .map_err(|e| AppError::storage(StorageStage::MetadataCommit, e.to_string()))?;
    if !deleted {
        return Err(AppError::NotFound("Video not found".to_string()).into());
    }

    state.thumbnail_cache.remove(video_id);

    // The record is gone either way; a stray object is only logged.
    if let Some(key) = record
        .video_url
        .as_deref()
        .and_then(|url| state.storage.key_from_url(url))
    {
        if let Err(e) = state.storage.delete(&key).await {
            tracing::warn!(
                video_id = %video_id,
                storage_key = %key,
                orphaned_object = true,
                error = %e,
                "Failed to delete stored video object"
            );
        }
    }

    tracing::info!(video_id = %video_id, "Video deleted");
    Ok(StatusCode::NO_CONTENT)
}

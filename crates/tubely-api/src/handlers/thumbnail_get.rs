use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
};
use std::sync::Arc;
use tubely_core::AppError;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/thumbnails/{id}",
    tag = "thumbnails",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Thumbnail image bytes"),
        (status = 404, description = "No cached thumbnail", body = ErrorResponse)
    )
)]
pub async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let thumbnail = state
        .thumbnail_cache
        .get(video_id)
        .ok_or_else(|| AppError::NotFound("Thumbnail not found".to_string()))?;

    Ok((
        [
            (CONTENT_TYPE, thumbnail.media_type),
            (CACHE_CONTROL, "no-store".to_string()),
        ],
        thumbnail.data,
    ))
}

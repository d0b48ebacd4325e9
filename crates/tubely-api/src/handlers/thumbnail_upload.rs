use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{multipart_error, read_field_limited};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use std::sync::Arc;
use tubely_core::{AppError, VideoRecord};
use tubely_processing::load_owned_video;
use uuid::Uuid;

const THUMBNAIL_FIELD: &str = "thumbnail";

#[utoipa::path(
    post,
    path = "/videos/{id}/thumbnail",
    tag = "thumbnails",
    params(("id" = Uuid, Path, description = "Video ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Thumbnail stored", body = VideoRecord),
        (status = 400, description = "Invalid thumbnail", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(video_id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VideoRecord>, HttpAppError> {
    let mut multipart = multipart?;

    // Fail fast before buffering the image; the service checks again.
    load_owned_video(state.repository.as_ref(), video_id, user.user_id).await?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(String::from);
        let data = read_field_limited(field, state.thumbnails.max_bytes()).await?;

        let record = state
            .thumbnails
            .ingest(user.user_id, video_id, content_type.as_deref(), data)
            .await?;
        return Ok(Json(record));
    }

    Err(AppError::Validation("Thumbnail file missing".to_string()).into())
}

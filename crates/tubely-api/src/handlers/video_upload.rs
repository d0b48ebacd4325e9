use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{declared_part_size, multipart_error};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use tubely_core::{AppError, VideoRecord};
use tubely_processing::{sign_video, UploadRequest};
use uuid::Uuid;

const VIDEO_FIELD: &str = "video";

/// Upload the asset for an existing video.
///
/// The `video` part is streamed straight to a scratch file; it is never held
/// in memory. Responds with the updated record, its `videoURL` presigned when
/// signing succeeds and left as the stored object URL otherwise.
#[utoipa::path(
    post,
    path = "/videos/{id}/upload",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video processed and stored", body = VideoRecord),
        (status = 400, description = "Missing part, wrong type or too large", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 500, description = "Processing or storage failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(video_id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VideoRecord>, HttpAppError> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(String::from);
        let declared_size = declared_part_size(field.headers());
        let body = StreamReader::new(Box::pin(field.map_err(io::Error::other)));

        let record = state
            .ingest
            .ingest(UploadRequest {
                owner_id: user.user_id,
                video_id,
                content_type,
                declared_size,
                body,
            })
            .await?;

        // Already committed; fall back to the stored URL.
        return match sign_video(state.storage.as_ref(), record.clone(), state.presign_ttl()).await
        {
            Ok(signed) => Ok(Json(signed)),
            Err(e) => {
                tracing::warn!(
                    video_id = %record.id,
                    error = %e,
                    "Returning unsigned video URL after presign failure"
                );
                Ok(Json(record))
            }
        };
    }

    Err(AppError::Validation("Video file missing".to_string()).into())
}

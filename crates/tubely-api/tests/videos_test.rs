//! Video API integration tests.
//!
//! Run with: `cargo test -p tubely-api --test videos_test`

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use helpers::{setup_test_app, setup_test_app_with};
use serde_json::{json, Value};
use tubely_core::VideoRecord;
use tubely_db::VideoRepository;
use tubely_processing::test_helpers::{RecordingStorage, ScriptedRunner};
use uuid::Uuid;

fn mp4_form(bytes: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "video",
        Part::bytes(bytes.to_vec())
            .file_name("boots.mp4")
            .mime_type("video/mp4"),
    )
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = setup_test_app().await;

    let response = app.client().get("/videos").await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .client()
        .get("/videos")
        .add_header("Authorization", "Bearer not-a-jwt")
        .await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["metadata_store"], "memory");
}

#[tokio::test]
async fn test_create_list_get_delete() {
    let app = setup_test_app().await;
    let user = Uuid::new_v4();

    let response = app
        .client()
        .post("/videos")
        .add_header("Authorization", app.bearer(user))
        .json(&json!({ "title": "Boots", "description": "A pair of boots" }))
        .await;
    assert_eq!(response.status_code(), 201);
    let created: VideoRecord = response.json();
    assert_eq!(created.user_id, user);
    assert_eq!(created.title, "Boots");
    assert!(created.video_url.is_none());

    let response = app
        .client()
        .get("/videos")
        .add_header("Authorization", app.bearer(user))
        .await;
    assert_eq!(response.status_code(), 200);
    let listed: Vec<VideoRecord> = response.json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    // Other users see nothing
    let response = app
        .client()
        .get("/videos")
        .add_header("Authorization", app.bearer(Uuid::new_v4()))
        .await;
    let listed: Vec<VideoRecord> = response.json();
    assert!(listed.is_empty());

    let response = app
        .client()
        .get(&format!("/videos/{}", created.id))
        .add_header("Authorization", app.bearer(user))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .client()
        .delete(&format!("/videos/{}", created.id))
        .add_header("Authorization", app.bearer(user))
        .await;
    assert_eq!(response.status_code(), 204);

    let response = app
        .client()
        .get(&format!("/videos/{}", created.id))
        .add_header("Authorization", app.bearer(user))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_create_rejects_blank_title() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/videos")
        .add_header("Authorization", app.bearer(Uuid::new_v4()))
        .json(&json!({ "title": "   " }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_get_and_delete_enforce_ownership() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let record = app.seed_video(owner, "Boots").await;
    let stranger = app.bearer(Uuid::new_v4());

    let response = app
        .client()
        .get(&format!("/videos/{}", record.id))
        .add_header("Authorization", stranger.clone())
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .client()
        .delete(&format!("/videos/{}", record.id))
        .add_header("Authorization", stranger)
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .client()
        .get(&format!("/videos/{}", Uuid::new_v4()))
        .add_header("Authorization", app.bearer(owner))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_upload_stores_landscape_video_and_signs_url() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let record = app.seed_video(owner, "Boots").await;

    let response = app
        .client()
        .post(&format!("/videos/{}/upload", record.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(mp4_form(b"fake mp4 payload"))
        .await;
    assert_eq!(response.status_code(), 200);

    let signed: VideoRecord = response.json();
    let url = signed.video_url.expect("video url");
    assert!(url.starts_with(&format!("{}/landscape/", RecordingStorage::BASE_URL)));
    assert!(url.ends_with(".mp4?X-Amz-Expires=900"));

    let keys = app.storage.keys();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];
    assert!(key.starts_with("landscape/"));
    assert_eq!(key.len(), "landscape/".len() + 43 + ".mp4".len());

    let stored = app.storage.object(key).unwrap();
    assert_eq!(stored.data, b"fake mp4 payload");
    assert_eq!(stored.content_type, "video/mp4");

    // The record keeps the unsigned object URL
    let persisted = app.repository.get_video(record.id).await.unwrap().unwrap();
    assert_eq!(
        persisted.video_url.as_deref(),
        Some(format!("{}/{}", RecordingStorage::BASE_URL, key).as_str())
    );

    assert!(app.scratch_files().is_empty());
}

#[tokio::test]
async fn test_upload_returns_unsigned_url_when_presign_fails() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let record = app.seed_video(owner, "Boots").await;
    app.storage.set_fail_presign(true);

    let response = app
        .client()
        .post(&format!("/videos/{}/upload", record.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(mp4_form(b"payload"))
        .await;
    assert_eq!(response.status_code(), 200);

    let returned: VideoRecord = response.json();
    let persisted = app.repository.get_video(record.id).await.unwrap().unwrap();
    assert!(persisted.video_url.is_some());
    assert_eq!(returned.video_url, persisted.video_url);
    assert!(app.scratch_files().is_empty());
}

#[tokio::test]
async fn test_upload_classifies_portrait_and_other() {
    for (width, height, prefix) in [(1080, 1920, "portrait/"), (1024, 768, "other/")] {
        let app = setup_test_app_with(ScriptedRunner::new().with_dimensions(width, height)).await;
        let owner = Uuid::new_v4();
        let record = app.seed_video(owner, "Boots").await;

        let response = app
            .client()
            .post(&format!("/videos/{}/upload", record.id))
            .add_header("Authorization", app.bearer(owner))
            .multipart(mp4_form(b"payload"))
            .await;
        assert_eq!(response.status_code(), 200);

        let keys = app.storage.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with(prefix), "{} not under {}", keys[0], prefix);
    }
}

#[tokio::test]
async fn test_upload_rejects_wrong_content_type() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let record = app.seed_video(owner, "Boots").await;

    let form = MultipartForm::new().add_part(
        "video",
        Part::bytes(b"not a video".to_vec())
            .file_name("boots.mov")
            .mime_type("video/quicktime"),
    );
    let response = app
        .client()
        .post(&format!("/videos/{}/upload", record.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(app.storage.call_count(), 0);
}

#[tokio::test]
async fn test_upload_requires_video_field() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let record = app.seed_video(owner, "Boots").await;

    let form = MultipartForm::new().add_text("title", "Boots");
    let response = app
        .client()
        .post(&format!("/videos/{}/upload", record.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Video file missing");
}

#[tokio::test]
async fn test_upload_by_non_owner_is_forbidden() {
    let app = setup_test_app().await;
    let record = app.seed_video(Uuid::new_v4(), "Boots").await;

    let response = app
        .client()
        .post(&format!("/videos/{}/upload", record.id))
        .add_header("Authorization", app.bearer(Uuid::new_v4()))
        .multipart(mp4_form(b"payload"))
        .await;
    assert_eq!(response.status_code(), 403);
    assert_eq!(app.storage.call_count(), 0);

    let persisted = app.repository.get_video(record.id).await.unwrap().unwrap();
    assert!(persisted.video_url.is_none());
}

#[tokio::test]
async fn test_upload_to_missing_video_is_not_found() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&format!("/videos/{}/upload", Uuid::new_v4()))
        .add_header("Authorization", app.bearer(Uuid::new_v4()))
        .multipart(mp4_form(b"payload"))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_remux_failure_leaves_record_untouched() {
    let app = setup_test_app_with(ScriptedRunner::new().remux_fails(1)).await;
    let owner = Uuid::new_v4();
    let record = app.seed_video(owner, "Boots").await;

    let response = app
        .client()
        .post(&format!("/videos/{}/upload", record.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(mp4_form(b"payload"))
        .await;
    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["code"], "PROCESSING_FAILED");

    assert_eq!(app.storage.call_count(), 0);
    let persisted = app.repository.get_video(record.id).await.unwrap().unwrap();
    assert_eq!(persisted, record);
    assert!(app.scratch_files().is_empty());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app().await;

    let response = app.client().get("/openapi.json").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["paths"]["/videos/{id}/upload"].is_object());
}

//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs in-process: the in-memory metadata store, a recording
//! object store and scripted ffmpeg/ffprobe. No Docker or media tools needed.

use axum_test::TestServer;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tubely_api::auth::JwtService;
use tubely_api::setup::{routes, services};
use tubely_api::state::AppState;
use tubely_core::{BaseConfig, Config, IngestServiceConfig, StorageBackend, VideoRecord};
use tubely_db::{InMemoryVideoRepository, VideoRepository};
use tubely_processing::test_helpers::{RecordingStorage, ScriptedRunner};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";
pub const PUBLIC_BASE_URL: &str = "http://localhost:8091";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub repository: Arc<InMemoryVideoRepository>,
    pub storage: RecordingStorage,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Signed token for `user_id`, valid for an hour.
    pub fn token_for(&self, user_id: Uuid) -> String {
        JwtService::new(TEST_JWT_SECRET)
            .issue_token(user_id, chrono::Duration::hours(1))
            .unwrap()
    }

    pub fn bearer(&self, user_id: Uuid) -> String {
        format!("Bearer {}", self.token_for(user_id))
    }

    /// Store a draft video straight in the repository.
    pub async fn seed_video(&self, owner: Uuid, title: &str) -> VideoRecord {
        let record = VideoRecord::new(owner, title, None);
        self.repository.create_video(&record).await.unwrap();
        record
    }

    /// Files left behind in the upload scratch directory.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.state.config.upload_temp_dir())
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}

pub fn test_config(temp_dir: &TempDir) -> Config {
    Config(Box::new(IngestServiceConfig {
        base: BaseConfig {
            server_port: 8091,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 5,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            environment: "test".to_string(),
        },
        database_url: None,
        storage_backend: StorageBackend::S3,
        s3_bucket: Some("tubely-test".to_string()),
        s3_region: Some("us-east-1".to_string()),
        s3_endpoint: None,
        local_storage_path: None,
        local_storage_base_url: None,
        ffmpeg_path: "ffmpeg".to_string(),
        ffprobe_path: "ffprobe".to_string(),
        ffmpeg_timeout_secs: 5,
        ffprobe_timeout_secs: 5,
        upload_temp_dir: temp_dir.path().join("uploads"),
        presign_ttl_secs: 900,
        thumbnail_allowed_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
        thumbnail_cache_capacity: 16,
        public_base_url: PUBLIC_BASE_URL.to_string(),
    }))
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(ScriptedRunner::new()).await
}

/// Same as [`setup_test_app`] with a custom script for the media tools.
pub async fn setup_test_app_with(runner: ScriptedRunner) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let repository = Arc::new(InMemoryVideoRepository::new());
    let storage = RecordingStorage::new();

    let state = services::build_state(
        config.clone(),
        repository.clone(),
        Arc::new(storage.clone()),
        Arc::new(runner),
    )
    .unwrap();
    let router = routes::setup_routes(&config, state.clone()).unwrap();

    TestApp {
        server: TestServer::new(router).unwrap(),
        state,
        repository,
        storage,
        _temp_dir: temp_dir,
    }
}

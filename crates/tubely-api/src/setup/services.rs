//! Service wiring and application state setup

use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoRepository;
use tubely_processing::{
    FastStartRemuxer, IngestConfig, ProcessRunner, StreamInspector, ThumbnailCache,
    ThumbnailConfig, ThumbnailService, VideoIngestService,
};
use tubely_storage::Storage;

use crate::auth::JwtService;
use crate::state::AppState;

/// Build the shared state from already-constructed backends.
///
/// `runner` launches ffmpeg and ffprobe; tests pass a scripted one.
pub fn build_state(
    config: Config,
    repository: Arc<dyn VideoRepository>,
    storage: Arc<dyn Storage>,
    runner: Arc<dyn ProcessRunner>,
) -> Result<Arc<AppState>> {
    let remuxer = FastStartRemuxer::new(
        runner.clone(),
        config.ffmpeg_path(),
        config.ffmpeg_timeout(),
    )
    .context("Invalid FFMPEG_PATH")?;
    let inspector = StreamInspector::new(runner, config.ffprobe_path(), config.ffprobe_timeout())
        .context("Invalid FFPROBE_PATH")?;

    let ingest = Arc::new(VideoIngestService::new(
        repository.clone(),
        storage.clone(),
        remuxer,
        inspector,
        IngestConfig::new(config.upload_temp_dir()),
    ));

    let thumbnail_cache = Arc::new(ThumbnailCache::new(config.thumbnail_cache_capacity()));
    let thumbnails = Arc::new(ThumbnailService::new(
        repository.clone(),
        thumbnail_cache.clone(),
        ThumbnailConfig::new(
            config.public_base_url(),
            config.thumbnail_allowed_types().to_vec(),
        ),
    ));

    let jwt = Arc::new(JwtService::new(config.jwt_secret()));

    tracing::info!(
        ffmpeg_path = %config.ffmpeg_path(),
        ffprobe_path = %config.ffprobe_path(),
        temp_dir = %config.upload_temp_dir().display(),
        thumbnail_cache_capacity = config.thumbnail_cache_capacity(),
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config,
        repository,
        storage,
        ingest,
        thumbnails,
        thumbnail_cache,
        jwt,
    }))
}

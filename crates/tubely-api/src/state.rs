//! Application state shared by every handler.

use std::sync::Arc;
use std::time::Duration;
use tubely_core::Config;
use tubely_db::VideoRepository;
use tubely_processing::{ThumbnailCache, ThumbnailService, VideoIngestService};
use tubely_storage::Storage;

use crate::auth::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn VideoRepository>,
    pub storage: Arc<dyn Storage>,
    pub ingest: Arc<VideoIngestService>,
    pub thumbnails: Arc<ThumbnailService>,
    /// Same cache the thumbnail service writes to
    pub thumbnail_cache: Arc<ThumbnailCache>,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    pub fn presign_ttl(&self) -> Duration {
        self.config.presign_ttl()
    }
}

//! Thumbnail ingestion and the in-process thumbnail cache.

use bytes::Bytes;
use chrono::Utc;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use tubely_core::constants::MAX_THUMBNAIL_UPLOAD_BYTES;
use tubely_core::{AppError, StorageStage, VideoRecord};
use tubely_db::VideoRepository;

use crate::ownership::load_owned_video;
use crate::validator::UploadValidator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Bytes,
    pub media_type: String,
}

/// Bounded LRU of thumbnails keyed by video id.
///
/// Entries are lost on restart; a record's `thumbnailURL` can outlive its
/// cached image, in which case the thumbnail route answers 404.
pub struct ThumbnailCache {
    entries: Mutex<LruCache<Uuid, Thumbnail>>,
}

impl ThumbnailCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Uuid, Thumbnail>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, video_id: Uuid) -> Option<Thumbnail> {
        self.lock().get(&video_id).cloned()
    }

    /// Insert and return the entry it replaced.
    pub fn insert(&self, video_id: Uuid, thumbnail: Thumbnail) -> Option<Thumbnail> {
        self.lock().put(video_id, thumbnail)
    }

    pub fn remove(&self, video_id: Uuid) -> Option<Thumbnail> {
        self.lock().pop(&video_id)
    }

    /// Put back `previous` (or clear the slot when there was none).
    pub fn restore(&self, video_id: Uuid, previous: Option<Thumbnail>) {
        let mut entries = self.lock();
        match previous {
            Some(thumbnail) => {
                entries.put(video_id, thumbnail);
            }
            None => {
                entries.pop(&video_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub max_bytes: u64,
    /// Empty means any `image/*` type
    pub allowed_types: Vec<String>,
    /// Prefix for the `thumbnailURL` written to records
    pub public_base_url: String,
}

impl ThumbnailConfig {
    pub fn new(public_base_url: impl Into<String>, allowed_types: Vec<String>) -> Self {
        Self {
            max_bytes: MAX_THUMBNAIL_UPLOAD_BYTES,
            allowed_types,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn thumbnail_url(&self, video_id: Uuid) -> String {
        format!(
            "{}/thumbnails/{}",
            self.public_base_url.trim_end_matches('/'),
            video_id
        )
    }
}

pub struct ThumbnailService {
    repository: Arc<dyn VideoRepository>,
    cache: Arc<ThumbnailCache>,
    config: ThumbnailConfig,
    validator: UploadValidator,
}

impl ThumbnailService {
    pub fn new(
        repository: Arc<dyn VideoRepository>,
        cache: Arc<ThumbnailCache>,
        config: ThumbnailConfig,
    ) -> Self {
        let validator = UploadValidator::thumbnail(config.allowed_types.clone())
            .with_max_file_size(config.max_bytes);
        Self {
            repository,
            cache,
            config,
            validator,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.config.max_bytes
    }

    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn ingest(
        &self,
        owner_id: Uuid,
        video_id: Uuid,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<VideoRecord, AppError> {
        load_owned_video(self.repository.as_ref(), video_id, owner_id).await?;

        let media_type = self.validator.validate_content_type(content_type)?;
        self.validator.validate_received_size(data.len() as u64)?;

        let previous = self.cache.insert(video_id, Thumbnail { data, media_type });

        let thumbnail_url = self.config.thumbnail_url(video_id);
        match self
            .repository
            .set_thumbnail_url(video_id, &thumbnail_url, Utc::now())
            .await
        {
            Ok(record) => {
                tracing::info!("Thumbnail stored");
                Ok(record)
            }
            Err(e) => {
                self.cache.restore(video_id, previous);
                tracing::error!(error = %e, "Thumbnail metadata commit failed");
                Err(AppError::storage(
                    StorageStage::MetadataCommit,
                    e.to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FlakyRepository;

    fn png(bytes: &'static [u8]) -> Thumbnail {
        Thumbnail {
            data: Bytes::from_static(bytes),
            media_type: "image/png".to_string(),
        }
    }

    async fn setup(
        allowed: Vec<String>,
    ) -> (
        ThumbnailService,
        FlakyRepository,
        Arc<ThumbnailCache>,
        VideoRecord,
    ) {
        let repo = FlakyRepository::new();
        let record = VideoRecord::new(Uuid::new_v4(), "Boots", None);
        repo.create_video(&record).await.unwrap();
        let cache = Arc::new(ThumbnailCache::new(8));
        let service = ThumbnailService::new(
            Arc::new(repo.clone()),
            cache.clone(),
            ThumbnailConfig::new("http://localhost:8091/", allowed),
        );
        (service, repo, cache, record)
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let cache = ThumbnailCache::new(2);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        cache.insert(a, png(b"a"));
        cache.insert(b, png(b"b"));
        assert!(cache.get(a).is_some());
        cache.insert(c, png(b"c"));

        assert!(cache.get(b).is_none());
        assert!(cache.get(a).is_some());
        assert!(cache.get(c).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_restore() {
        let cache = ThumbnailCache::new(4);
        let id = Uuid::new_v4();
        let previous = cache.insert(id, png(b"new"));
        cache.restore(id, previous);
        assert!(cache.get(id).is_none());

        cache.insert(id, png(b"old"));
        let previous = cache.insert(id, png(b"new"));
        cache.restore(id, previous);
        assert_eq!(cache.get(id), Some(png(b"old")));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = ThumbnailCache::new(0);
        cache.insert(Uuid::new_v4(), png(b"a"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_caches_and_sets_url() {
        let (service, repo, cache, record) = setup(vec![]).await;

        let updated = service
            .ingest(record.user_id, record.id, Some("image/png"), Bytes::from_static(b"png"))
            .await
            .unwrap();

        let expected = format!("http://localhost:8091/thumbnails/{}", record.id);
        assert_eq!(updated.thumbnail_url.as_deref(), Some(expected.as_str()));
        assert_eq!(
            repo.get_video(record.id).await.unwrap().unwrap().thumbnail_url,
            updated.thumbnail_url
        );
        assert_eq!(cache.get(record.id), Some(png(b"png")));
    }

    #[tokio::test]
    async fn test_ingest_rejects_non_owner_and_bad_types() {
        let (service, _repo, cache, record) =
            setup(vec!["image/jpeg".to_string(), "image/png".to_string()]).await;

        let err = service
            .ingest(Uuid::new_v4(), record.id, Some("image/png"), Bytes::from_static(b"png"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Ownership(_)));

        let err = service
            .ingest(record.user_id, record.id, Some("image/gif"), Bytes::from_static(b"gif"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .ingest(record.user_id, record.id, Some("text/plain"), Bytes::from_static(b"txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .ingest(record.user_id, record.id, Some("image/png"), Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_rejects_oversized() {
        let (service, _repo, cache, record) = setup(vec![]).await;
        let data = Bytes::from(vec![0u8; (10 << 20) + 1]);

        let err = service
            .ingest(record.user_id, record.id, Some("image/png"), data)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_keeps_video_url_committed_meanwhile() {
        let (service, repo, _cache, record) = setup(vec![]).await;
        // Committed by a video ingestion
        repo.set_video_url(record.id, "https://bucket/landscape/a.mp4", Utc::now())
            .await
            .unwrap();

        let updated = service
            .ingest(record.user_id, record.id, Some("image/png"), Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert_eq!(
            updated.video_url.as_deref(),
            Some("https://bucket/landscape/a.mp4")
        );
        assert!(updated.thumbnail_url.is_some());
    }

    #[tokio::test]
    async fn test_commit_failure_restores_previous_thumbnail() {
        let (service, repo, cache, record) = setup(vec![]).await;
        service
            .ingest(record.user_id, record.id, Some("image/png"), Bytes::from_static(b"old"))
            .await
            .unwrap();

        repo.set_fail_updates(true);
        let err = service
            .ingest(record.user_id, record.id, Some("image/png"), Bytes::from_static(b"new"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Storage {
                stage: StorageStage::MetadataCommit,
                ..
            }
        ));
        assert_eq!(cache.get(record.id), Some(png(b"old")));
    }
}

//! Repository trait abstractions
//!
//! Keeps callers independent of the database so they can be tested against
//! the in-memory implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tubely_core::VideoRecord;
use uuid::Uuid;

/// Key-value style access to video records.
///
/// The `set_*` writes touch one URL column plus `updated_at`, so a video
/// commit and a thumbnail commit for the same id never undo each other.
/// Concurrent writes of the same column are not serialized: the last write wins.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Get a video by ID
    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>>;

    /// Point the record at a new video object and return the stored record.
    /// Fails if the record does not exist.
    async fn set_video_url(
        &self,
        id: Uuid,
        video_url: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<VideoRecord>;

    /// Same as [`set_video_url`](Self::set_video_url) for the thumbnail link.
    async fn set_thumbnail_url(
        &self,
        id: Uuid,
        thumbnail_url: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<VideoRecord>;

    async fn create_video(&self, record: &VideoRecord) -> Result<()>;

    /// Videos owned by `user_id`, newest first
    async fn list_videos_for_user(&self, user_id: Uuid) -> Result<Vec<VideoRecord>>;

    /// Returns whether a record was deleted
    async fn delete_video(&self, id: Uuid) -> Result<bool>;
}

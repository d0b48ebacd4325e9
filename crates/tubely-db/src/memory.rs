use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tubely_core::VideoRecord;
use uuid::Uuid;

use crate::traits::VideoRepository;

/// Process-local metadata store, selected when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryVideoRepository {
    videos: Arc<RwLock<HashMap<Uuid, VideoRecord>>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.videos.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.videos.read().await.is_empty()
    }

    /// Apply `change` under the write lock and return the result.
    async fn modify(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut VideoRecord),
    ) -> Result<VideoRecord> {
        let mut videos = self.videos.write().await;
        match videos.get_mut(&id) {
            Some(video) => {
                change(video);
                Ok(video.clone())
            }
            None => anyhow::bail!("Video {} no longer exists", id),
        }
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>> {
        Ok(self.videos.read().await.get(&id).cloned())
    }

    async fn set_video_url(
        &self,
        id: Uuid,
        video_url: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<VideoRecord> {
        self.modify(id, |video| {
            video.video_url = Some(video_url.to_string());
            video.updated_at = updated_at;
        })
        .await
    }

    async fn set_thumbnail_url(
        &self,
        id: Uuid,
        thumbnail_url: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<VideoRecord> {
        self.modify(id, |video| {
            video.thumbnail_url = Some(thumbnail_url.to_string());
            video.updated_at = updated_at;
        })
        .await
    }

    async fn create_video(&self, record: &VideoRecord) -> Result<()> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&record.id) {
            anyhow::bail!("Video {} already exists", record.id);
        }
        videos.insert(record.id, record.clone());
        Ok(())
    }

    async fn list_videos_for_user(&self, user_id: Uuid) -> Result<Vec<VideoRecord>> {
        let mut videos: Vec<VideoRecord> = self
            .videos
            .read()
            .await
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn delete_video(&self, id: Uuid) -> Result<bool> {
        Ok(self.videos.write().await.remove(&id).is_some())
    }
}

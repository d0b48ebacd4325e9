use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use tubely_core::VideoRecord;
use uuid::Uuid;

use crate::traits::VideoRepository;

const VIDEO_COLUMNS: &str =
    "id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at";

#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `column` is one of the fixed URL column names, never caller input.
    async fn set_url_column(
        &self,
        column: &'static str,
        id: Uuid,
        url: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<VideoRecord> {
        let video = sqlx::query_as::<Postgres, VideoRecord>(&format!(
            "UPDATE videos SET {} = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            column, VIDEO_COLUMNS
        ))
        .bind(id)
        .bind(url)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update {}", column))?;

        video.ok_or_else(|| anyhow::anyhow!("Video {} no longer exists", id))
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    #[tracing::instrument(skip(self), err)]
    async fn get_video(&self, id: Uuid) -> Result<Option<VideoRecord>> {
        let video = sqlx::query_as::<Postgres, VideoRecord>(&format!(
            "SELECT {} FROM videos WHERE id = $1",
            VIDEO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load video")?;

        Ok(video)
    }

    #[tracing::instrument(skip(self, video_url), err)]
    async fn set_video_url(
        &self,
        id: Uuid,
        video_url: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<VideoRecord> {
        self.set_url_column("video_url", id, video_url, updated_at).await
    }

    #[tracing::instrument(skip(self, thumbnail_url), err)]
    async fn set_thumbnail_url(
        &self,
        id: Uuid,
        thumbnail_url: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<VideoRecord> {
        self.set_url_column("thumbnail_url", id, thumbnail_url, updated_at).await
    }

    async fn create_video(&self, record: &VideoRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO videos (id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.thumbnail_url)
        .bind(&record.video_url)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create video")?;

        Ok(())
    }

    async fn list_videos_for_user(&self, user_id: Uuid) -> Result<Vec<VideoRecord>> {
        let videos = sqlx::query_as::<Postgres, VideoRecord>(&format!(
            "SELECT {} FROM videos WHERE user_id = $1 ORDER BY created_at DESC",
            VIDEO_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list videos")?;

        Ok(videos)
    }

    async fn delete_video(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete video")?;

        Ok(result.rows_affected() > 0)
    }
}

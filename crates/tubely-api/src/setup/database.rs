//! Metadata store setup

use anyhow::Result;
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::{connect, run_migrations, InMemoryVideoRepository, PgVideoRepository, VideoRepository};

/// Postgres when `DATABASE_URL` is set, otherwise an in-process map.
pub async fn setup_repository(config: &Config) -> Result<Arc<dyn VideoRepository>> {
    let Some(url) = config.database_url() else {
        tracing::warn!("DATABASE_URL not set; video records are kept in memory only");
        return Ok(Arc::new(InMemoryVideoRepository::new()));
    };

    tracing::info!("Connecting to database...");
    let pool = connect(url, config.db_max_connections(), config.db_timeout_seconds()).await?;
    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    run_migrations(&pool).await?;

    Ok(Arc::new(PgVideoRepository::new(pool)))
}

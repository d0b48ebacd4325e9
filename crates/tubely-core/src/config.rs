//! Configuration module
//!
//! Configuration for the API server and the ingestion pipeline: metadata
//! store, object storage, external media tools and thumbnail settings.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_PRESIGN_TTL_SECS;
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const FFMPEG_TIMEOUT_SECS: u64 = 300;
const FFPROBE_TIMEOUT_SECS: u64 = 30;
const THUMBNAIL_CACHE_CAPACITY: usize = 1024;

/// Settings shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
}

/// Ingestion service configuration
#[derive(Clone, Debug)]
pub struct IngestServiceConfig {
    pub base: BaseConfig,
    /// Postgres connection string; `None` selects the in-memory metadata store.
    pub database_url: Option<String>,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible providers (MinIO, LocalStack, ...)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // External media tools
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub ffmpeg_timeout_secs: u64,
    pub ffprobe_timeout_secs: u64,
    pub upload_temp_dir: PathBuf,
    pub presign_ttl_secs: u64,
    // Thumbnails
    pub thumbnail_allowed_types: Vec<String>,
    pub thumbnail_cache_capacity: usize,
    pub public_base_url: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IngestServiceConfig>);

impl Config {
    fn inner(&self) -> &IngestServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = IngestServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.inner().ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.inner().ffprobe_path
    }

    pub fn ffmpeg_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().ffmpeg_timeout_secs)
    }

    pub fn ffprobe_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().ffprobe_timeout_secs)
    }

    pub fn upload_temp_dir(&self) -> &std::path::Path {
        &self.inner().upload_temp_dir
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.inner().presign_ttl_secs)
    }

    pub fn thumbnail_allowed_types(&self) -> &[String] {
        &self.inner().thumbnail_allowed_types
    }

    pub fn thumbnail_cache_capacity(&self) -> usize {
        self.inner().thumbnail_cache_capacity
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }
}

fn is_production_name(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl IngestServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8091".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::S3,
        };

        let port = base.server_port;
        let config = IngestServiceConfig {
            base,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok()
                .or_else(|| Some("us-east-1".to_string())),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .ok()
                .or_else(|| Some("./storage".to_string())),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .ok()
                .or_else(|| Some(format!("http://localhost:{}/media", port))),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            ffmpeg_timeout_secs: env::var("FFMPEG_TIMEOUT_SECS")
                .unwrap_or_else(|_| FFMPEG_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(FFMPEG_TIMEOUT_SECS),
            ffprobe_timeout_secs: env::var("FFPROBE_TIMEOUT_SECS")
                .unwrap_or_else(|_| FFPROBE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(FFPROBE_TIMEOUT_SECS),
            upload_temp_dir: env::var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            presign_ttl_secs: env::var("PRESIGN_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_PRESIGN_TTL_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_PRESIGN_TTL_SECS),
            thumbnail_allowed_types: parse_list(
                &env::var("THUMBNAIL_ALLOWED_TYPES")
                    .unwrap_or_else(|_| "image/jpeg,image/png".to_string()),
            ),
            thumbnail_cache_capacity: env::var("THUMBNAIL_CACHE_CAPACITY")
                .unwrap_or_else(|_| THUMBNAIL_CACHE_CAPACITY.to_string())
                .parse()
                .unwrap_or(THUMBNAIL_CACHE_CAPACITY),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if is_production_name(&self.base.environment)
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.ffmpeg_timeout_secs == 0 || self.ffprobe_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "FFMPEG_TIMEOUT_SECS and FFPROBE_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.thumbnail_cache_capacity == 0 {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_CACHE_CAPACITY must be greater than zero"
            ));
        }

        if self
            .thumbnail_allowed_types
            .iter()
            .any(|t| !t.starts_with("image/"))
        {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_ALLOWED_TYPES may only list image/* content types"
            ));
        }

        Ok(())
    }
}

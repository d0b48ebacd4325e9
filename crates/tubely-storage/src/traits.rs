//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object storage backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage abstraction
///
/// The ingestion pipeline writes objects and hands out time-limited links to
/// them; it never reads objects back.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a local file under `storage_key` and return the object's
    /// fully-qualified URL.
    async fn upload_file(
        &self,
        storage_key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Generate a presigned GET URL valid for `expires_in`.
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Fully-qualified URL of the object stored under `storage_key`.
    fn object_url(&self, storage_key: &str) -> String;

    /// Inverse of [`Storage::object_url`]. Returns `None` for URLs that do not
    /// belong to this backend.
    fn key_from_url(&self, url: &str) -> Option<String> {
        let base = self.object_url("");
        url.strip_prefix(base.as_str())
            .filter(|key| !key.is_empty())
            .map(String::from)
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

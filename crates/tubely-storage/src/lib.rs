//! Tubely Storage Library
//!
//! Object storage abstraction and its backends (S3 and local filesystem).
//!
//! # Storage key format
//!
//! Video keys are `{classification}/{token}.mp4`, where the token is 32 random
//! bytes encoded as unpadded URL-safe base64. Keys never embed caller-supplied
//! strings. Key generation lives in the `keys` module so every backend and the
//! ingestion pipeline agree on the layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::build_video_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;

//! Tubely Core Library
//!
//! Domain models, the error taxonomy and configuration shared by every Tubely
//! crate: storage backends, the metadata store, the ingestion pipeline and the
//! HTTP API.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, IngestServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel, ProcessingStage, StorageStage};
pub use models::{Classification, VideoRecord};
pub use storage_types::StorageBackend;

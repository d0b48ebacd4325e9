//! Tubely media processing
//!
//! The video ingestion pipeline and its building blocks: a process runner for
//! the external media tools, the fast-start remuxer, the stream inspector,
//! scratch-file guards and upload validation. Thumbnail ingestion and signed
//! playback links live here too since they share ownership checks with the
//! pipeline.

pub mod ownership;
pub mod process;
pub mod thumbnail;
pub mod validator;
pub mod video;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use ownership::load_owned_video;
pub use process::{ProcessError, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use thumbnail::{Thumbnail, ThumbnailCache, ThumbnailConfig, ThumbnailService};
pub use validator::{UploadValidator, ValidationError};
pub use video::{
    classify, sign_video, sign_videos, FastStartRemuxer, IngestConfig, ProbeError, RemuxError,
    StreamInspector, UploadRequest, VideoIngestService,
};

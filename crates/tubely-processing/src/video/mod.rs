//! Video ingestion pipeline

pub mod inspector;
pub mod orchestration;
pub mod playback;
pub mod remuxer;

pub use inspector::{classify, ProbeError, StreamInspector};
pub use orchestration::{IngestConfig, UploadRequest, VideoIngestService};
pub use playback::{sign_video, sign_videos};
pub use remuxer::{processed_path_for, FastStartRemuxer, RemuxError};

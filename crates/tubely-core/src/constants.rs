//! Fixed limits of the ingestion pipeline.

/// Largest accepted video payload (1 GiB).
pub const MAX_VIDEO_UPLOAD_BYTES: u64 = 1 << 30;

/// The only content type accepted for video uploads.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Largest accepted thumbnail payload (10 MiB).
pub const MAX_THUMBNAIL_UPLOAD_BYTES: u64 = 10 << 20;

/// Default lifetime of presigned playback URLs.
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 900;

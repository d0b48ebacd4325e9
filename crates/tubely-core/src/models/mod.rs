//! Data models shared across the workspace.

mod video;

pub use video::{Classification, CreateVideoRequest, VideoRecord};

//! HTTP request handlers

pub mod health;
pub mod thumbnail_get;
pub mod thumbnail_upload;
pub mod video_upload;
pub mod videos;

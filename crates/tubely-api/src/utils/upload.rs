//! Common utilities for multipart upload handlers

use axum::extract::multipart::{Field, MultipartError};
use axum::http::{header::CONTENT_LENGTH, HeaderMap};
use bytes::{Bytes, BytesMut};
use tubely_core::AppError;

pub fn multipart_error(err: MultipartError) -> AppError {
    AppError::Validation(format!("Failed to read multipart body: {}", err))
}

/// Size announced on the part itself, when the client sent one.
///
/// Only a per-part `Content-Length` allows rejecting an oversized upload
/// before anything is written. Browsers rarely send one, so most uploads are
/// caught by the streaming size check after the scratch file exists.
pub fn declared_part_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Buffer a small field, failing as soon as it grows past `max_bytes`.
pub async fn read_field_limited(mut field: Field<'_>, max_bytes: u64) -> Result<Bytes, AppError> {
    let mut data = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if (data.len() + chunk.len()) as u64 > max_bytes {
            return Err(AppError::Validation(format!(
                "File too large: more than {} bytes",
                max_bytes
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data.freeze())
}

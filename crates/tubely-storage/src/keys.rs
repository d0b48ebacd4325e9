//! Storage key construction for uploaded videos.
//!
//! Key format: `{classification}/{token}.mp4`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use tubely_core::Classification;

/// Number of random bytes behind every key token.
pub const TOKEN_BYTES: usize = 32;

/// Random URL-safe token drawn from the thread-local CSPRNG.
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the object key for a processed video.
///
/// Uniqueness rests on the token's entropy; existing keys are never checked.
pub fn build_video_key(classification: Classification) -> String {
    format!("{}/{}.mp4", classification.as_str(), random_token())
}

use tubely_core::constants::{MAX_THUMBNAIL_UPLOAD_BYTES, MAX_VIDEO_UPLOAD_BYTES, VIDEO_CONTENT_TYPE};
use tubely_core::AppError;

/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid content type: {content_type} (allowed: {allowed})")]
    InvalidContentType {
        content_type: String,
        allowed: String,
    },

    #[error("Missing content type")]
    MissingContentType,

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[derive(Debug, Clone)]
enum ContentTypeRule {
    /// Type must equal this value exactly once normalized
    Exact(String),
    /// Type must start with this prefix and, when the list is non-empty, be in it
    Family {
        prefix: String,
        allowed: Vec<String>,
    },
}

/// Size and content-type checks for a single upload kind.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: u64,
    rule: ContentTypeRule,
}

impl UploadValidator {
    /// Videos: `video/mp4` only, up to 1 GiB.
    pub fn video() -> Self {
        Self {
            max_file_size: MAX_VIDEO_UPLOAD_BYTES,
            rule: ContentTypeRule::Exact(VIDEO_CONTENT_TYPE.to_string()),
        }
    }

    /// Thumbnails: any `image/*` type, narrowed to `allowed` when it is
    /// non-empty, up to 10 MiB.
    pub fn thumbnail(allowed: Vec<String>) -> Self {
        Self {
            max_file_size: MAX_THUMBNAIL_UPLOAD_BYTES,
            rule: ContentTypeRule::Family {
                prefix: "image/".to_string(),
                allowed: allowed.iter().map(|t| normalize_mime_type(t)).collect(),
            },
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Reject a known size above the limit. Zero is not rejected here since a
    /// declared size of zero is usually a client that did not know the size.
    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Like [`validate_file_size`](Self::validate_file_size) but for bytes
    /// actually received, where zero means the upload was empty.
    pub fn validate_received_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        self.validate_file_size(size)
    }

    /// Validate the declared content type and return it normalized.
    pub fn validate_content_type(
        &self,
        content_type: Option<&str>,
    ) -> Result<String, ValidationError> {
        let raw = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .ok_or(ValidationError::MissingContentType)?;
        let normalized = normalize_mime_type(raw);

        let accepted = match &self.rule {
            ContentTypeRule::Exact(expected) => &normalized == expected,
            ContentTypeRule::Family { prefix, allowed } => {
                normalized.starts_with(prefix.as_str())
                    && normalized.len() > prefix.len()
                    && (allowed.is_empty() || allowed.contains(&normalized))
            }
        };

        if !accepted {
            return Err(ValidationError::InvalidContentType {
                content_type: raw.to_string(),
                allowed: self.describe_allowed(),
            });
        }

        Ok(normalized)
    }

    fn describe_allowed(&self) -> String {
        match &self.rule {
            ContentTypeRule::Exact(expected) => expected.clone(),
            ContentTypeRule::Family { prefix, allowed } if allowed.is_empty() => {
                format!("{}*", prefix)
            }
            ContentTypeRule::Family { allowed, .. } => allowed.join(", "),
        }
    }
}

/// Lowercase and trim a media type. Parameters are kept, so
/// `video/mp4; codecs=avc1` does not normalize to `video/mp4`.
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_content_type_exact() {
        let validator = UploadValidator::video();
        assert_eq!(
            validator.validate_content_type(Some("video/mp4")).unwrap(),
            "video/mp4"
        );
        assert!(validator.validate_content_type(Some(" Video/MP4 ")).is_ok());
    }

    #[test]
    fn test_video_content_type_rejections() {
        let validator = UploadValidator::video();
        assert!(matches!(
            validator.validate_content_type(Some("video/quicktime")),
            Err(ValidationError::InvalidContentType { .. })
        ));
        assert!(validator
            .validate_content_type(Some("video/mp4; codecs=avc1"))
            .is_err());
        assert!(validator.validate_content_type(Some("video/mp4x")).is_err());
        assert!(matches!(
            validator.validate_content_type(None),
            Err(ValidationError::MissingContentType)
        ));
        assert!(matches!(
            validator.validate_content_type(Some("   ")),
            Err(ValidationError::MissingContentType)
        ));
    }

    #[test]
    fn test_video_size_limit() {
        let validator = UploadValidator::video();
        assert!(validator.validate_file_size(1 << 30).is_ok());
        assert!(matches!(
            validator.validate_file_size((1 << 30) + 1),
            Err(ValidationError::FileTooLarge { .. })
        ));
        assert!(validator.validate_file_size(0).is_ok());
        assert!(matches!(
            validator.validate_received_size(0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_thumbnail_any_image() {
        let validator = UploadValidator::thumbnail(vec![]);
        assert!(validator.validate_content_type(Some("image/png")).is_ok());
        assert!(validator.validate_content_type(Some("image/webp")).is_ok());
        assert!(validator.validate_content_type(Some("image/")).is_err());
        assert!(validator.validate_content_type(Some("video/mp4")).is_err());
        assert!(validator.validate_received_size(10 << 20).is_ok());
        assert!(validator.validate_received_size((10 << 20) + 1).is_err());
    }

    #[test]
    fn test_thumbnail_allow_list() {
        let validator =
            UploadValidator::thumbnail(vec!["image/jpeg".to_string(), "IMAGE/PNG".to_string()]);
        assert!(validator.validate_content_type(Some("image/png")).is_ok());
        assert!(validator.validate_content_type(Some("image/jpeg")).is_ok());
        let err = validator
            .validate_content_type(Some("image/gif"))
            .unwrap_err();
        assert!(err.to_string().contains("image/jpeg, image/png"));
    }

    #[test]
    fn test_validation_error_maps_to_validation() {
        let err: AppError = ValidationError::EmptyFile.into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

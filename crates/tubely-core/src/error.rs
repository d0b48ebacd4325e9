//! Error types module
//!
//! Every failure the ingestion pipeline can surface is one variant of
//! [`AppError`]. Variants carry structured fields (pipeline stage, exit code)
//! so callers branch on the kind of failure instead of on message text.
//! [`ErrorMetadata`] describes how each variant is presented over HTTP.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "VALIDATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// External tool stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Remux,
    Probe,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Remux => "remux",
            ProcessingStage::Probe => "probe",
        }
    }
}

impl Display for ProcessingStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Local disk, object store or metadata store step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStage {
    MetadataLookup,
    LocalWrite,
    Upload,
    MetadataCommit,
    Presign,
}

impl StorageStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageStage::MetadataLookup => "metadata-lookup",
            StorageStage::LocalWrite => "local-write",
            StorageStage::Upload => "upload",
            StorageStage::MetadataCommit => "metadata-commit",
            StorageStage::Presign => "presign",
        }
    }
}

impl Display for StorageStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Reason recorded on processing failures caused by the process time limit.
pub const TIMEOUT_REASON: &str = "timeout";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Ownership(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Processing failed at {stage} stage: {reason}")]
    Processing {
        stage: ProcessingStage,
        exit_code: Option<i32>,
        reason: String,
    },

    #[error("Storage failed at {stage} stage: {message}")]
    Storage {
        stage: StorageStage,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check the uploaded file size and content type"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Provide a valid bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Ownership(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Only the owner of this video can modify it"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Processing { .. } => (
            500,
            "PROCESSING_FAILED",
            false,
            Some("Check that the file is a valid MP4 video"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage {
            stage: StorageStage::MetadataCommit,
            ..
        } => (
            500,
            "STORAGE_FAILED",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage { .. } => (
            500,
            "STORAGE_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Ownership(_) => "Ownership",
            AppError::NotFound(_) => "NotFound",
            AppError::Processing { .. } => "Processing",
            AppError::Storage { .. } => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    pub fn storage(stage: StorageStage, message: impl Into<String>) -> Self {
        AppError::Storage {
            stage,
            message: message.into(),
        }
    }

    pub fn processing(
        stage: ProcessingStage,
        exit_code: Option<i32>,
        reason: impl Into<String>,
    ) -> Self {
        AppError::Processing {
            stage,
            exit_code,
            reason: reason.into(),
        }
    }

    /// True when an external tool was killed for exceeding its time limit.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Processing { reason, .. } if reason == TIMEOUT_REASON)
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Ownership(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Processing { stage, reason, .. } if reason == TIMEOUT_REASON => {
                format!("Video {} step timed out", stage)
            }
            AppError::Processing { stage, .. } => format!("Video {} step failed", stage),
            AppError::Storage { stage, .. } => format!("Storage {} step failed", stage),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

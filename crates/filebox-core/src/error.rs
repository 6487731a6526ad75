//! Error types module
//!
//! Every failure the intake controller reports is unified under [`AppError`].
//! Lower layers keep their own typed errors (`ValidationError` in
//! `filebox-processing`, `ArchiveError` in `filebox-infra`) and convert into
//! `AppError` at the controller boundary.

use std::io;

use crate::models::FileStatus;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected outcomes such as a rejected file
    Debug,
    /// Recoverable issues the user should see
    Warn,
    /// Unexpected failures
    Error,
}

/// Describes how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the user may simply retry or adjust input
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// Short user-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("File count exceeded: {current} existing + {incoming} new exceeds limit of {max}")]
    FileCountExceeded {
        current: usize,
        incoming: usize,
        max: i64,
    },

    #[error("Scan failed: {0}")]
    Scan(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: FileStatus, to: FileStatus },

    #[error("Configuration error: {0}")]
    Config(String),

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
        AppError::Config(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Validation(_) => (
            "VALIDATION_ERROR",
            true,
            Some("Remove the file or choose a different one"),
            LogLevel::Debug,
        ),
        AppError::FileCountExceeded { .. } => (
            "MAX_FILES_EXCEEDED",
            true,
            Some("Remove some files before adding more"),
            LogLevel::Debug,
        ),
        AppError::Scan(_) => (
            "SCAN_ERROR",
            true,
            Some("Retry the scan or choose a different file"),
            LogLevel::Warn,
        ),
        AppError::Archive(_) => (
            "ARCHIVE_ERROR",
            true,
            Some("Retry archive creation"),
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Verify the file ID exists"),
            LogLevel::Debug,
        ),
        AppError::Busy(_) => (
            "BUSY",
            true,
            Some("Wait for the current operation to finish"),
            LogLevel::Debug,
        ),
        AppError::InvalidTransition { .. } => (
            "INVALID_TRANSITION",
            false,
            None,
            LogLevel::Error,
        ),
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check the configuration values"),
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl AppError {
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
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::FileCountExceeded { .. } => {
                crate::constants::error_messages::MAX_FILES_EXCEEDED.to_string()
            }
            AppError::Scan(ref msg) => msg.clone(),
            AppError::Archive(ref msg) => {
                format!("{}: {}", crate::constants::error_messages::ZIP_ERROR, msg)
            }
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Busy(ref msg) => msg.clone(),
            AppError::InvalidTransition { .. } => "Internal error".to_string(),
            AppError::Config(ref msg) => msg.clone(),
            AppError::Internal(ref msg) => msg.clone(),
            AppError::InternalWithSource { message, .. } => message.clone(),
        }
    }
}

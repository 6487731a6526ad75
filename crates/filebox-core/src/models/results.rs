use serde::Serialize;
use std::fmt;

use super::file::FileStatus;
use crate::constants::{error_messages, success_messages};

/// Outcome of a validation check: pass/fail plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

impl<E: fmt::Display> From<Result<(), E>> for ValidationResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => ValidationResult::valid(),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }
}

/// Outcome of screening one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// Passed; carries a detail such as "File passed security scan".
    Clean(String),
    /// A heuristic or the remote scanner rejected the file.
    Infected(String),
    /// The scan could not complete. Treated as a failure.
    Error(String),
}

impl ScanResult {
    pub fn clean() -> Self {
        ScanResult::Clean(success_messages::SCAN_PASSED.to_string())
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, ScanResult::Clean(_))
    }

    pub fn details(&self) -> &str {
        match self {
            ScanResult::Clean(d) | ScanResult::Infected(d) | ScanResult::Error(d) => d,
        }
    }

    /// Short headline for a failing result.
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            ScanResult::Clean(_) => None,
            ScanResult::Infected(_) => Some(error_messages::VIRUS_DETECTED),
            ScanResult::Error(_) => Some(error_messages::SCAN_ERROR),
        }
    }

    /// Reason stored on a rejected record, e.g.
    /// `File failed security scan: Suspicious filename detected`.
    pub fn rejection_reason(&self) -> Option<String> {
        self.error_message()
            .map(|headline| format!("{}: {}", headline, self.details()))
    }

    /// Terminal record status this result maps to.
    pub fn status(&self) -> FileStatus {
        if self.is_clean() {
            FileStatus::Valid
        } else {
            FileStatus::Infected
        }
    }
}

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::source::FileHandle;
use crate::error::AppError;

/// Identifier of a file within one intake session.
///
/// Built from name, size, submission time and a random disambiguator; unique in
/// practice, not cryptographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn generate(name: &str, size: u64) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        FileId(format!(
            "{}-{}-{}-{}",
            name,
            size,
            Utc::now().timestamp_millis(),
            &random[..9]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        FileId(s.to_string())
    }
}

/// Lifecycle of a file: `Pending → Validating → (Invalid | Scanning) → (Valid | Infected)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Validating,
    Scanning,
    Valid,
    Invalid,
    Infected,
}

impl FileStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FileStatus::Valid | FileStatus::Invalid | FileStatus::Infected
        )
    }

    /// Queued for, or undergoing, screening.
    pub fn is_in_flight(self) -> bool {
        matches!(self, FileStatus::Validating | FileStatus::Scanning)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, FileStatus::Invalid | FileStatus::Infected)
    }

    fn rank(self) -> u8 {
        match self {
            FileStatus::Pending => 0,
            FileStatus::Validating => 1,
            FileStatus::Scanning => 2,
            FileStatus::Valid | FileStatus::Invalid | FileStatus::Infected => 3,
        }
    }

    /// Whether `self → next` is a legal forward transition.
    ///
    /// `Invalid` is only reachable before screening starts, `Valid` and
    /// `Infected` only from `Scanning`.
    pub fn can_advance_to(self, next: FileStatus) -> bool {
        if next.rank() <= self.rank() {
            return false;
        }
        match next {
            FileStatus::Invalid => self.rank() < FileStatus::Scanning.rank(),
            FileStatus::Valid | FileStatus::Infected => self == FileStatus::Scanning,
            _ => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Validating => "validating",
            FileStatus::Scanning => "scanning",
            FileStatus::Valid => "valid",
            FileStatus::Invalid => "invalid",
            FileStatus::Infected => "infected",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-submitted file and its intake state.
///
/// Records are values: every phase takes a snapshot and hands back a new record
/// through [`advance`](Self::advance) or [`fail`](Self::fail). `error` is set
/// exactly when the status is `Invalid` or `Infected`.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: FileId,
    pub handle: FileHandle,
    pub status: FileStatus,
    pub error: Option<String>,
    pub progress: Option<u8>,
}

impl FileRecord {
    pub fn new(handle: FileHandle) -> Self {
        let id = FileId::generate(handle.name(), handle.size());
        Self {
            id,
            handle,
            status: FileStatus::Pending,
            error: None,
            progress: None,
        }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn size(&self) -> u64 {
        self.handle.size()
    }

    pub fn content_type(&self) -> &str {
        self.handle.content_type()
    }

    /// Move to a non-failure status.
    pub fn advance(self, next: FileStatus) -> Result<Self, AppError> {
        if next.is_failure() {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.transition(next, None)
    }

    /// Move to `Invalid` or `Infected` with a human-readable reason.
    pub fn fail(self, next: FileStatus, reason: impl Into<String>) -> Result<Self, AppError> {
        if !next.is_failure() {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.transition(next, Some(reason.into()))
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    fn transition(mut self, next: FileStatus, error: Option<String>) -> Result<Self, AppError> {
        if !self.status.can_advance_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.error = error;
        if next.is_terminal() {
            self.progress = None;
        }
        Ok(self)
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            id: self.id.clone(),
            name: self.name().to_string(),
            size: self.size(),
            content_type: self.content_type().to_string(),
            status: self.status,
            error: self.error.clone(),
            progress: self.progress,
        }
    }
}

/// Serializable view of a [`FileRecord`] without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

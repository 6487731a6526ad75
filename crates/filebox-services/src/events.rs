//! Notifications published by the intake controller.

use filebox_core::constants::success_messages;
use filebox_core::models::FileId;
use filebox_core::format_file_size;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntakeEvent {
    FilesRejected { files: Vec<RejectedFile> },
    FilesQueued { count: usize },
    ScanFinished { clean: usize, infected: Vec<RejectedFile> },
    FileRemoved { id: FileId, name: String },
    ArchiveCreated { entries: Vec<String>, size: u64 },
    ArchiveFailed { reason: String },
    SessionReset,
}

impl IntakeEvent {
    /// One-line, user-facing text for this event.
    pub fn message(&self) -> String {
        match self {
            IntakeEvent::FilesRejected { files } => match files.as_slice() {
                [only] => format!("{}: {}", only.name, only.reason),
                _ => format!("{} file(s) rejected", files.len()),
            },
            IntakeEvent::FilesQueued { count } => {
                format!("{} file(s) added for scanning", count)
            }
            IntakeEvent::ScanFinished { clean, infected } if infected.is_empty() => {
                format!("{} file(s) passed security scan", clean)
            }
            IntakeEvent::ScanFinished { clean, infected } => format!(
                "{} file(s) passed security scan, {} rejected",
                clean,
                infected.len()
            ),
            IntakeEvent::FileRemoved { name, .. } => format!("File removed: {}", name),
            IntakeEvent::ArchiveCreated { entries, size } => format!(
                "{} ({} file(s), {})",
                success_messages::ARCHIVE_CREATED,
                entries.len(),
                format_file_size(*size)
            ),
            IntakeEvent::ArchiveFailed { reason } => reason.clone(),
            IntakeEvent::SessionReset => "Session cleared".to_string(),
        }
    }
}

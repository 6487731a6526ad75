//! Intake session state.
//!
//! [`IntakeSession`] owns the ordered record list and the session flags. It is
//! a plain synchronous value; async phases take snapshots of records and hand
//! finished records back through [`IntakeSession::apply_update`]. Every reset
//! bumps an epoch so results computed for an earlier session are dropped.

use filebox_core::constants::error_messages;
use filebox_core::models::{FileHandle, FileId, FileRecord, FileStatus, FileSummary};
use filebox_core::{AppError, FileBoxConfig};
use filebox_processing::{check_file_count_limit, FileValidator};
use serde::Serialize;

use crate::events::RejectedFile;

/// What happened to one `files_added` batch.
#[derive(Debug, Clone)]
pub struct Admission {
    pub epoch: u64,
    /// Records that passed validation and await screening, in submission order.
    pub queued: Vec<FileRecord>,
    pub rejected: Vec<RejectedFile>,
}

/// Reactive view of the session handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub records: Vec<FileSummary>,
    pub scanning: bool,
    pub creating: bool,
    pub archive_progress: u8,
    pub valid_file_count: usize,
    pub can_create_archive: bool,
}

pub struct IntakeSession {
    config: FileBoxConfig,
    validator: FileValidator,
    records: Vec<FileRecord>,
    epoch: u64,
    active_scans: usize,
    creating: bool,
    archive_progress: u8,
}

impl IntakeSession {
    pub fn new(config: FileBoxConfig) -> Self {
        let validator = FileValidator::from_config(&config);
        Self {
            config,
            validator,
            records: Vec::new(),
            epoch: 0,
            active_scans: 0,
            creating: false,
            archive_progress: 0,
        }
    }

    pub fn config(&self) -> &FileBoxConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn get(&self, id: &FileId) -> Option<&FileRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Validate a new batch and append it to the session.
    ///
    /// The whole batch is refused when it would exceed the file-count limit.
    /// Otherwise every file is recorded: failures become `Invalid`, the rest
    /// stay `Validating` and are returned for screening. When the aggregate
    /// size check fails, the batch's individually valid files are marked
    /// `Invalid` as well.
    pub fn admit(&mut self, batch: Vec<FileHandle>) -> Result<Admission, AppError> {
        let current = self.records.len();
        if !check_file_count_limit(current, batch.len(), self.config.max_files) {
            return Err(AppError::FileCountExceeded {
                current,
                incoming: batch.len(),
                max: self.config.max_files,
            });
        }

        let existing: Vec<FileHandle> = self
            .records
            .iter()
            .filter(|r| !r.status.is_failure())
            .map(|r| r.handle.clone())
            .collect();
        let checked = self.validator.validate_batch(&batch, &existing);
        let total_error = checked.total.error.clone();

        let mut queued = Vec::new();
        let mut rejected = Vec::new();

        for (handle, result) in batch.into_iter().zip(checked.results) {
            let record = FileRecord::new(handle).advance(FileStatus::Validating)?;
            let reason = result.error.or_else(|| total_error.clone());

            let record = match reason {
                Some(reason) => {
                    tracing::debug!(
                        file_id = %record.id,
                        filename = %record.name(),
                        reason = %reason,
                        "File rejected by validation"
                    );
                    rejected.push(RejectedFile {
                        name: record.name().to_string(),
                        reason: reason.clone(),
                    });
                    record.fail(FileStatus::Invalid, reason)?
                }
                None => {
                    queued.push(record.clone());
                    record
                }
            };
            self.records.push(record);
        }

        if !queued.is_empty() {
            self.active_scans += 1;
        }

        Ok(Admission {
            epoch: self.epoch,
            queued,
            rejected,
        })
    }

    /// Replace a tracked record with a newer version of itself.
    ///
    /// Ignored when the session was reset since `epoch`, the record is gone,
    /// or the update would move its status backwards.
    pub fn apply_update(&mut self, epoch: u64, update: &FileRecord) -> bool {
        if epoch != self.epoch {
            return false;
        }
        match self.records.iter_mut().find(|r| r.id == update.id) {
            Some(current) if reachable(current.status, update.status) => {
                *current = update.clone();
                true
            }
            _ => false,
        }
    }

    /// Close out one screening run started by [`admit`](Self::admit).
    pub fn finish_scan(&mut self, epoch: u64, results: &[FileRecord]) -> bool {
        if epoch != self.epoch {
            return false;
        }
        for record in results {
            self.apply_update(epoch, record);
        }
        self.active_scans = self.active_scans.saturating_sub(1);
        true
    }

    /// Remove a record that is not being processed.
    pub fn remove(&mut self, id: &FileId) -> Result<FileRecord, AppError> {
        let index = self
            .records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

        if self.records[index].status.is_in_flight() {
            return Err(AppError::Busy(format!(
                "File {} is still being processed",
                self.records[index].name()
            )));
        }

        Ok(self.records.remove(index))
    }

    /// Discard every record and start a new epoch.
    pub fn reset(&mut self) {
        self.records.clear();
        self.epoch += 1;
        self.active_scans = 0;
        self.creating = false;
        self.archive_progress = 0;
    }

    /// Mark archive creation as started and return the `Valid` files in order.
    pub fn begin_archive(&mut self) -> Result<(u64, Vec<FileHandle>), AppError> {
        if self.creating {
            return Err(AppError::Busy("Archive creation already in progress".to_string()));
        }
        if self.is_scanning() {
            return Err(AppError::Busy("Files are still being scanned".to_string()));
        }

        let handles: Vec<FileHandle> = self
            .records
            .iter()
            .filter(|r| r.status == FileStatus::Valid)
            .map(|r| r.handle.clone())
            .collect();
        if handles.is_empty() {
            return Err(AppError::Archive(error_messages::NO_VALID_FILES.to_string()));
        }

        self.creating = true;
        self.archive_progress = 0;
        Ok((self.epoch, handles))
    }

    pub fn set_archive_progress(&mut self, epoch: u64, progress: u8) -> bool {
        if epoch != self.epoch || !self.creating {
            return false;
        }
        self.archive_progress = progress.min(100);
        true
    }

    pub fn finish_archive(&mut self, epoch: u64) {
        if epoch == self.epoch {
            self.creating = false;
            self.archive_progress = 0;
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.active_scans > 0
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub fn valid_file_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == FileStatus::Valid)
            .count()
    }

    pub fn can_create_archive(&self) -> bool {
        self.valid_file_count() > 0 && !self.is_scanning() && !self.creating
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            records: self.records.iter().map(FileRecord::summary).collect(),
            scanning: self.is_scanning(),
            creating: self.creating,
            archive_progress: self.archive_progress,
            valid_file_count: self.valid_file_count(),
            can_create_archive: self.can_create_archive(),
        }
    }
}

/// `to` lies ahead of `from`, possibly through an unseen `Scanning` step.
fn reachable(from: FileStatus, to: FileStatus) -> bool {
    from.can_advance_to(to)
        || (from.can_advance_to(FileStatus::Scanning) && FileStatus::Scanning.can_advance_to(to))
}

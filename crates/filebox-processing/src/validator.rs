use filebox_core::format_file_size;
use filebox_core::models::{FileHandle, FileSource, ValidationResult};
use filebox_core::{AppError, FileBoxConfig};

/// Validation failures; the display strings are the user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File is empty (maximum allowed size {})", limit(.max))]
    EmptyFile { max: u64 },

    #[error("File size exceeds the maximum allowed size ({})", limit(.max))]
    FileTooLarge { size: u64, max: u64 },

    #[error("File extension is not allowed ({extension})")]
    InvalidExtension { extension: String },

    #[error("File type is not allowed ({content_type})")]
    InvalidContentType { content_type: String },

    #[error("Total archive size exceeds the maximum allowed size ({})", limit(.max))]
    TotalSizeExceeded { total: u64, max: u64 },

    #[error("Maximum number of files exceeded ({max})")]
    TooManyFiles {
        current: usize,
        incoming: usize,
        max: i64,
    },
}

fn limit(max: &u64) -> String {
    format_file_size(*max)
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::TooManyFiles {
                current,
                incoming,
                max,
            } => AppError::FileCountExceeded {
                current,
                incoming,
                max,
            },
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Per-file results of a batch plus the aggregate size check.
#[derive(Debug, Clone)]
pub struct BatchValidation {
    pub results: Vec<ValidationResult>,
    pub total: ValidationResult,
}

/// File admission validator
///
/// Pure checks over file metadata (size, extension, declared MIME type) and
/// batch aggregates. Nothing here reads file content.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    max_total_size: u64,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl FileValidator {
    pub fn new(
        max_file_size: u64,
        max_total_size: u64,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            max_total_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| normalize_extension(&e))
                .collect(),
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &FileBoxConfig) -> Self {
        Self::new(
            config.max_file_size,
            config.max_total_size,
            config.allowed_extensions.clone(),
            config.allowed_mime_types.clone(),
        )
    }

    /// Validate file size: must be in `(0, max_file_size]`.
    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile {
                max: self.max_file_size,
            });
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate file extension (case-insensitive, last dotted segment).
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = file_extension(filename);

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension { extension });
        }

        Ok(())
    }

    /// Validate declared content type, exactly or through a `category/*` wildcard.
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.trim().to_lowercase();

        let allowed = self.allowed_content_types.iter().any(|allowed| {
            match allowed.strip_suffix("/*") {
                Some(category) => normalized
                    .split_once('/')
                    .is_some_and(|(c, _)| c == category),
                None => *allowed == normalized,
            }
        });

        if !allowed {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    /// Validate all aspects of a file, stopping at the first failure.
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        file_size: u64,
    ) -> Result<(), ValidationError> {
        self.validate_file_size(file_size)?;
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        Ok(())
    }

    pub fn validate_single(&self, file: &dyn FileSource) -> ValidationResult {
        self.validate_all(file.name(), file.content_type(), file.size())
            .into()
    }

    /// Validate new files individually, then check that the retained existing
    /// files plus the new files that passed fit under the aggregate limit.
    pub fn validate_batch(
        &self,
        new_files: &[FileHandle],
        existing: &[FileHandle],
    ) -> BatchValidation {
        let results: Vec<ValidationResult> = new_files
            .iter()
            .map(|file| self.validate_single(file.as_ref()))
            .collect();

        let existing_total: u64 = existing.iter().map(|f| f.size()).sum();
        let new_total: u64 = new_files
            .iter()
            .zip(&results)
            .filter(|(_, result)| result.is_valid)
            .map(|(file, _)| file.size())
            .sum();
        let total = existing_total.saturating_add(new_total);

        let total_result = if total > self.max_total_size {
            tracing::debug!(
                total_bytes = total,
                max_bytes = self.max_total_size,
                "Batch exceeds aggregate size limit"
            );
            ValidationResult::invalid(
                ValidationError::TotalSizeExceeded {
                    total,
                    max: self.max_total_size,
                }
                .to_string(),
            )
        } else {
            ValidationResult::valid()
        };

        BatchValidation {
            results,
            total: total_result,
        }
    }
}

/// Whether `incoming` more files fit next to `current` ones. `max_files <= 0` means unlimited.
pub fn check_file_count_limit(current: usize, incoming: usize, max_files: i64) -> bool {
    if max_files <= 0 {
        return true;
    }
    (current as u64).saturating_add(incoming as u64) <= max_files as u64
}

/// `"Report.PDF"` → `".pdf"`; a name without a dot yields the whole name.
pub fn file_extension(filename: &str) -> String {
    let last = filename.rsplit('.').next().unwrap_or(filename);
    format!(".{}", last.to_lowercase())
}

fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().to_lowercase();
    if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}

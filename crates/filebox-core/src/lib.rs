//! FileBox Core Library
//!
//! This crate provides the domain models, error types, configuration and constants
//! shared by every FileBox component: the validator and screener in
//! `filebox-processing`, the archiver in `filebox-infra` and the intake session in
//! `filebox-services`.

pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod models;

// Re-export commonly used types
pub use config::{FileBoxConfig, ScannerConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use format::format_file_size;
pub use models::{
    DiskFile, FileHandle, FileId, FileRecord, FileSource, FileStatus, FileSummary, InMemoryFile,
    ScanResult, ValidationResult,
};

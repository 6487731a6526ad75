//! FileBox Infrastructure Library
//!
//! Shared infrastructure for FileBox components:
//! - Archive assembly (ZIP and tar.gz)
//! - Telemetry initialization
//! - Serializable error reports

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "archive")]
pub mod archive;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

pub use error::ErrorResponse;

#[cfg(feature = "archive")]
pub use archive::{
    archive_file_name, create_archive, ArchiveError, ArchiveFormat, ArchiveOutput,
};

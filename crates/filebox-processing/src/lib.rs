//! FileBox Processing Library
//!
//! Admission checks for submitted files: the metadata [`FileValidator`], the
//! heuristic [`Screener`] and the [`RemoteScanner`] seam for an external
//! scanning service.

pub mod screening;
pub mod upload;
pub mod validator;

// Re-export commonly used types
pub use screening::Screener;
pub use upload::{RemoteScanner, TransportError};
pub use validator::{check_file_count_limit, BatchValidation, FileValidator, ValidationError};

pub mod file;
pub mod results;
pub mod source;

pub use file::{FileId, FileRecord, FileStatus, FileSummary};
pub use results::{ScanResult, ValidationResult};
pub use source::{DiskFile, FileHandle, FileSource, InMemoryFile};

mod service;

pub use service::{
    archive_file_name, create_archive, unique_entry_name, ArchiveError, ArchiveFormat,
    ArchiveOutput,
};

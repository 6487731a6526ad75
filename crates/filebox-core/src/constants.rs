//! Limits, allow-lists and the user-facing message catalogue.

/// Default per-file size limit: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default aggregate size limit for one archive: 50 MiB.
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 50 * 1024 * 1024;

/// `max_files` value meaning "no limit".
pub const UNLIMITED_FILES: i64 = -1;

/// Default timeout for the optional remote scan endpoint.
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 30_000;

/// Number of screenings allowed in flight at once.
pub const CONCURRENT_SCAN_LIMIT: usize = 3;

/// Text content larger than this is not pattern-scanned.
pub const TEXT_SCAN_MAX_BYTES: u64 = 1024 * 1024;

/// Bytes read from the head of a file for the signature check.
pub const SIGNATURE_HEADER_LEN: usize = 4;

/// Deflate / gzip level used for archives (medium).
pub const ARCHIVE_COMPRESSION_LEVEL: u32 = 6;

/// Default prefix of generated archive file names.
pub const DEFAULT_ARCHIVE_PREFIX: &str = "filebox";

pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "text/plain",
    "text/html",
    "text/markdown",
    "application/json",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/bmp",
    "image/heif",
];

pub const AUDIO_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
    "audio/aiff",
    "audio/aac",
    "audio/flac",
];

pub const VIDEO_MIME_TYPES: &[&str] = &[
    "video/quicktime",
    "video/mp4",
    "video/x-msvideo",
    "video/x-ms-wmv",
    "video/x-matroska",
];

/// Extensions accepted by default (dotted, lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    // Documents
    ".pdf", ".txt", ".docx", ".xlsx", ".pptx", ".html", ".md", ".json",
    // Images
    ".jpg", ".jpeg", ".png", ".webp", ".gif", ".svg", ".bmp", ".heif",
    // Audio
    ".mp3", ".wav", ".ogg", ".aiff", ".aac", ".flac",
    // Video
    ".mov", ".mp4", ".avi", ".wmv", ".mkv",
];

/// MIME types accepted by default: every category concatenated.
pub fn allowed_mime_types() -> Vec<String> {
    DOCUMENT_MIME_TYPES
        .iter()
        .chain(IMAGE_MIME_TYPES)
        .chain(AUDIO_MIME_TYPES)
        .chain(VIDEO_MIME_TYPES)
        .map(|s| s.to_string())
        .collect()
}

pub fn allowed_extensions() -> Vec<String> {
    ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

/// Declared MIME type for a lowercase extension (without dot).
///
/// Used when a file arrives without a declared type, e.g. when read from disk.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "md" => "text/markdown",
        "json" => "application/json",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "heif" => "image/heif",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "aiff" => "audio/aiff",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "mov" => "video/quicktime",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "mkv" => "video/x-matroska",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// User-visible failure messages.
pub mod error_messages {
    pub const FILE_TOO_LARGE: &str = "File size exceeds the maximum allowed size";
    pub const EMPTY_FILE: &str = "File is empty";
    pub const TOTAL_SIZE_EXCEEDED: &str = "Total archive size exceeds the maximum allowed size";
    pub const INVALID_FILE_TYPE: &str = "File type is not allowed";
    pub const INVALID_EXTENSION: &str = "File extension is not allowed";
    pub const VIRUS_DETECTED: &str = "File failed security scan";
    pub const SCAN_ERROR: &str = "Error occurred during file scanning";
    pub const ZIP_ERROR: &str = "Error occurred while creating archive";
    pub const MAX_FILES_EXCEEDED: &str = "Maximum number of files exceeded";
    pub const NO_FILES: &str = "No files to archive";
    pub const NO_VALID_FILES: &str = "No valid files to archive";
}

/// User-visible success messages.
pub mod success_messages {
    pub const FILE_VALIDATED: &str = "File validated successfully";
    pub const SCAN_PASSED: &str = "File passed security scan";
    pub const SCAN_DISABLED: &str = "Scanning disabled";
    pub const ARCHIVE_CREATED: &str = "Archive created successfully";
}

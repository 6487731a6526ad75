//! Filename heuristic.

/// Executable extensions that are rejected anywhere in a name, so a disguised
/// `invoice.exe.pdf` is caught as well as `setup.exe`.
const DANGEROUS_EXTENSIONS: &[&str] = &[
    ".exe", ".bat", ".cmd", ".com", ".scr", ".pif", ".app", ".sh", ".run",
];

/// Why a filename was flagged, or `None` if it looks harmless.
pub fn suspicious_filename_reason(filename: &str) -> Option<&'static str> {
    if filename.contains('\0') {
        return Some("null byte");
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Some("path traversal");
    }

    if filename.starts_with('.') {
        return Some("hidden file");
    }

    let lower = filename.to_lowercase();
    if DANGEROUS_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
        return Some("dangerous extension");
    }

    None
}

pub fn is_suspicious_filename(filename: &str) -> bool {
    suspicious_filename_reason(filename).is_some()
}

//! Magic-byte signature heuristic.

use filebox_core::constants::SIGNATURE_HEADER_LEN;

/// Plain-text formats never checked against a signature.
const EXEMPT_EXTENSIONS: &[&str] = &["txt", "json", "md"];

/// Acceptable header prefixes for an extension; `None` when the extension has
/// no known signature and is therefore not checked.
pub fn signatures_for(extension: &str) -> Option<&'static [&'static [u8]]> {
    let signatures: &'static [&'static [u8]] = match extension {
        "pdf" => &[&[0x25, 0x50, 0x44, 0x46]],
        "png" => &[&[0x89, 0x50, 0x4E, 0x47]],
        "jpg" => &[&[0xFF, 0xD8, 0xFF]],
        "gif" => &[&[0x47, 0x49, 0x46, 0x38]],
        "zip" => &[&[0x50, 0x4B, 0x03, 0x04]],
        // MPEG frame sync or ID3 tag
        "mp3" => &[&[0xFF, 0xFB], &[0x49, 0x44, 0x33]],
        "mp4" => &[&[0x66, 0x74, 0x79, 0x70]],
        "webp" => &[&[0x57, 0x45, 0x42, 0x50]],
        _ => return None,
    };
    Some(signatures)
}

/// Whether `header` (the first bytes of the file) is consistent with the
/// extension of `filename`.
pub fn signature_matches(filename: &str, header: &[u8]) -> bool {
    let extension = match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => return true,
    };

    if EXEMPT_EXTENSIONS.contains(&extension.as_str()) {
        return true;
    }

    let Some(signatures) = signatures_for(&extension) else {
        return true;
    };

    let header = &header[..header.len().min(SIGNATURE_HEADER_LEN)];
    signatures.iter().any(|sig| header.starts_with(sig))
}

use bytes::Bytes;
use filebox_core::models::{FileHandle, InMemoryFile};

pub const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Bytes that start like a PNG; enough for the signature check.
pub fn png_bytes() -> Vec<u8> {
    let mut data = PNG_HEADER.to_vec();
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x0D]);
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&[0; 17]);
    data
}

pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n".to_vec()
}

/// ASCII text of roughly `len` bytes with nothing the content heuristic flags.
pub fn plain_text(len: usize) -> String {
    "Remember to buy milk and bread.\n"
        .chars()
        .cycle()
        .take(len)
        .collect()
}

pub fn file(name: &str, content_type: &str, data: impl Into<Bytes>) -> FileHandle {
    InMemoryFile::new(name, content_type, data).into_handle()
}

pub fn text_file(name: &str, content: &str) -> FileHandle {
    file(name, "text/plain", content.to_string())
}

/// A file of `size` zero bytes, for size-limit tests.
pub fn sized_file(name: &str, content_type: &str, size: usize) -> FileHandle {
    file(name, content_type, vec![0u8; size])
}

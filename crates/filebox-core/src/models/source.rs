//! Raw file handles.
//!
//! A [`FileSource`] is the content behind a [`FileRecord`](super::FileRecord): name,
//! size and declared MIME type are known up front, bytes are read asynchronously.
//! Reads are the suspension points of the intake pipeline.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use crate::constants::mime_for_extension;

/// Fallback declared type for content we cannot classify.
const OCTET_STREAM: &str = "application/octet-stream";

/// A user-submitted file.
#[async_trait]
pub trait FileSource: Send + Sync + fmt::Debug {
    /// File name as submitted (no directory components expected).
    fn name(&self) -> &str;

    /// Size in bytes as reported at submission time.
    fn size(&self) -> u64;

    /// Declared MIME type.
    fn content_type(&self) -> &str;

    /// Read the whole content.
    async fn read_all(&self) -> io::Result<Bytes>;

    /// Read at most `len` bytes from the start of the content.
    async fn read_head(&self, len: usize) -> io::Result<Bytes> {
        let data = self.read_all().await?;
        Ok(data.slice(..len.min(data.len())))
    }
}

/// Shared, immutable handle to a file's content.
pub type FileHandle = Arc<dyn FileSource>;

/// File held fully in memory.
#[derive(Clone)]
pub struct InMemoryFile {
    name: String,
    content_type: String,
    data: Bytes,
}

impl InMemoryFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn into_handle(self) -> FileHandle {
        Arc::new(self)
    }
}

impl fmt::Debug for InMemoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

#[async_trait]
impl FileSource for InMemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    async fn read_all(&self) -> io::Result<Bytes> {
        Ok(self.data.clone())
    }

    async fn read_head(&self, len: usize) -> io::Result<Bytes> {
        Ok(self.data.slice(..len.min(self.data.len())))
    }
}

/// File on the local filesystem, read lazily.
///
/// The declared MIME type is derived from the extension, mirroring what a
/// browser reports for a file picked from disk.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    size: u64,
    content_type: String,
}

impl DiskFile {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a regular file: {}", path.display()),
            ));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid file name: {}", path.display()),
                )
            })?;

        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| mime_for_extension(&e))
            .unwrap_or(OCTET_STREAM)
            .to_string();

        Ok(Self {
            path,
            name,
            size: metadata.len(),
            content_type,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_handle(self) -> FileHandle {
        Arc::new(self)
    }
}

#[async_trait]
impl FileSource for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    async fn read_all(&self) -> io::Result<Bytes> {
        Ok(Bytes::from(tokio::fs::read(&self.path).await?))
    }

    async fn read_head(&self, len: usize) -> io::Result<Bytes> {
        let file = tokio::fs::File::open(&self.path).await?;
        let mut buffer = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }
}

use bytes::Bytes;
use chrono::NaiveDate;
use filebox_core::constants::{ARCHIVE_COMPRESSION_LEVEL, DEFAULT_ARCHIVE_PREFIX};
use filebox_core::models::FileHandle;
use filebox_core::AppError;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

/// Bytes compressed between two progress reports and scheduler yields.
const COMPRESSION_CHUNK_SIZE: usize = 64 * 1024;

/// Archive format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveFormat {
    #[default]
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "application/zip",
            ArchiveFormat::TarGz => "application/gzip",
        }
    }

    /// `"<prefix>-YYYY-MM-DD.<ext>"`
    pub fn file_name(self, prefix: &str, date: NaiveDate) -> String {
        format!("{}-{}.{}", prefix, date.format("%Y-%m-%d"), self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar-gz" | "tar.gz" | "tgz" => Ok(ArchiveFormat::TarGz),
            _ => Err(anyhow::anyhow!("Unsupported archive format: {}", s)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("No files to archive")]
    NoFiles,

    #[error("Failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        ArchiveError::Compression(err.to_string())
    }
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        AppError::Archive(err.to_string())
    }
}

/// A finished archive and the entry names actually stored, in input order.
#[derive(Debug, Clone)]
pub struct ArchiveOutput {
    pub format: ArchiveFormat,
    pub bytes: Bytes,
    pub names: Vec<String>,
}

/// Default download name for a ZIP archive created on `date`.
pub fn archive_file_name(prefix: Option<&str>, date: NaiveDate) -> String {
    ArchiveFormat::Zip.file_name(prefix.unwrap_or(DEFAULT_ARCHIVE_PREFIX), date)
}

/// Sanitize filename for archive entry to prevent path traversal.
/// Extracts only the base name (strips path components like `../`).
fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    let normalized = filename.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// First of `name`, `base_1.ext`, `base_2.ext`, ... not present in `used`.
pub fn unique_entry_name(name: &str, used: &HashSet<String>) -> String {
    if !used.contains(name) {
        return name.to_string();
    }

    let (base, extension) = match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base, Some(ext)),
        _ => (name, None),
    };

    (1u64..)
        .map(|counter| match extension {
            Some(ext) => format!("{}_{}.{}", base, counter, ext),
            None => format!("{}_{}", base, counter),
        })
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Forwards strictly increasing progress values to the caller.
struct Progress<F> {
    last: u8,
    callback: F,
}

impl<F: FnMut(u8)> Progress<F> {
    fn report(&mut self, value: u64) {
        let value = value.min(100) as u8;
        if value > self.last {
            self.last = value;
            (self.callback)(value);
        }
    }

    /// Phase 2 position for `done` of `total` bytes compressed.
    fn compressed(&mut self, done: u64, total: u64) {
        self.report(50 + done * 50 / total.max(1));
    }
}

/// Create an archive from admitted files.
///
/// Phase 1 (0–50%) reads every file in order and assigns collision-free entry
/// names; phase 2 (50–100%) compresses the entries at a medium level, yielding
/// to the scheduler between chunks. Progress is reported through `on_progress`
/// and never decreases.
#[tracing::instrument(skip(files, on_progress), fields(file_count = files.len()))]
pub async fn create_archive<F>(
    format: ArchiveFormat,
    files: &[FileHandle],
    on_progress: F,
) -> Result<ArchiveOutput, ArchiveError>
where
    F: FnMut(u8),
{
    if files.is_empty() {
        return Err(ArchiveError::NoFiles);
    }

    let start = Instant::now();
    let mut progress = Progress {
        last: 0,
        callback: on_progress,
    };

    let file_count = files.len() as u64;
    let mut used = HashSet::with_capacity(files.len());
    let mut entries: Vec<(String, Bytes)> = Vec::with_capacity(files.len());

    for (index, file) in files.iter().enumerate() {
        let data = file.read_all().await.map_err(|source| ArchiveError::Read {
            name: file.name().to_string(),
            source,
        })?;

        let safe_name = sanitize_archive_filename(file.name(), &format!("file_{}", index + 1));
        let entry_name = unique_entry_name(&safe_name, &used);
        if entry_name != file.name() {
            tracing::debug!(
                original = %file.name(),
                entry = %entry_name,
                "Renamed archive entry"
            );
        }
        used.insert(entry_name.clone());
        entries.push((entry_name, data));

        progress.report((index as u64 + 1) * 50 / file_count);
    }

    let bytes = match format {
        ArchiveFormat::Zip => write_zip(&entries, &mut progress).await?,
        ArchiveFormat::TarGz => write_tar_gz(&entries, &mut progress).await?,
    };
    progress.report(100);

    let names: Vec<String> = entries.into_iter().map(|(name, _)| name).collect();

    tracing::info!(
        format = ?format,
        entries = names.len(),
        archive_bytes = bytes.len(),
        duration_ms = start.elapsed().as_millis(),
        "Archive created"
    );

    Ok(ArchiveOutput {
        format,
        bytes: Bytes::from(bytes),
        names,
    })
}

async fn write_zip<F: FnMut(u8)>(
    entries: &[(String, Bytes)],
    progress: &mut Progress<F>,
) -> Result<Vec<u8>, ArchiveError> {
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    let total: u64 = entries.iter().map(|(_, data)| data.len() as u64).sum();
    let mut written = 0u64;

    let mut zip = ZipWriter::new(io::Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL as i32))
        .unix_permissions(0o644);

    for (name, data) in entries {
        zip.start_file(name.as_str(), options)?;
        for chunk in data.chunks(COMPRESSION_CHUNK_SIZE) {
            zip.write_all(chunk)?;
            written += chunk.len() as u64;
            progress.compressed(written, total);
            tokio::task::yield_now().await;
        }
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

async fn write_tar_gz<F: FnMut(u8)>(
    entries: &[(String, Bytes)],
    progress: &mut Progress<F>,
) -> Result<Vec<u8>, ArchiveError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::Builder;

    let total: u64 = entries.iter().map(|(_, data)| data.len() as u64).sum();
    let mut written = 0u64;
    let mtime = chrono::Utc::now().timestamp().max(0) as u64;

    let encoder = GzEncoder::new(Vec::new(), Compression::new(ARCHIVE_COMPRESSION_LEVEL));
    let mut tar = Builder::new(encoder);

    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644); // rw-r--r--
        header.set_mtime(mtime);
        header.set_cksum();

        tar.append_data(&mut header, name, &data[..])?;
        written += data.len() as u64;
        progress.compressed(written, total);
        tokio::task::yield_now().await;
    }

    let encoder = tar.into_inner()?;
    Ok(encoder.finish()?)
}

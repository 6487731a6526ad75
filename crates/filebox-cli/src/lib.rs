use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use filebox_core::constants::DEFAULT_ARCHIVE_PREFIX;
use filebox_core::models::{DiskFile, FileHandle, FileStatus, FileSummary};
use filebox_core::FileBoxConfig;
use filebox_infra::ArchiveFormat;
use filebox_services::SessionSnapshot;
use serde::Serialize;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Command-line settings layered over the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub no_scan: bool,
    pub scan_endpoint: Option<String>,
    pub max_file_size_mb: Option<u64>,
    pub max_files: Option<i64>,
}

/// Load configuration from a JSON file, or from `FILEBOX_*` variables when no
/// file is given, then apply `overrides`.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> anyhow::Result<FileBoxConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            FileBoxConfig::from_json_str(&raw)?
        }
        None => FileBoxConfig::from_env()?,
    };

    if overrides.no_scan {
        config.scanner.enabled = false;
    }
    if let Some(endpoint) = &overrides.scan_endpoint {
        config.scanner.remote_endpoint = Some(endpoint.clone());
    }
    if let Some(mb) = overrides.max_file_size_mb {
        config.max_file_size = mb.saturating_mul(BYTES_PER_MB);
        config.max_total_size = config.max_total_size.max(config.max_file_size);
    }
    if let Some(max_files) = overrides.max_files {
        config.max_files = max_files;
    }

    config.validate()?;
    Ok(config)
}

pub async fn open_files(paths: &[PathBuf]) -> anyhow::Result<Vec<FileHandle>> {
    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let file = DiskFile::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        handles.push(file.into_handle());
    }
    Ok(handles)
}

pub fn parse_archive_format(s: &str) -> Result<ArchiveFormat, String> {
    s.parse::<ArchiveFormat>().map_err(|e| e.to_string())
}

/// `./filebox-2024-05-01.zip` style default output path.
pub fn default_output_path(format: ArchiveFormat, date: NaiveDate) -> PathBuf {
    PathBuf::from(format.file_name(DEFAULT_ARCHIVE_PREFIX, date))
}

/// Per-file outcome of a `check` or `pack` run.
#[derive(Debug, Serialize)]
pub struct IntakeReport {
    pub files: Vec<FileSummary>,
    pub valid: usize,
    pub rejected: usize,
}

impl From<&SessionSnapshot> for IntakeReport {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let rejected = snapshot
            .records
            .iter()
            .filter(|r| r.status.is_failure())
            .count();
        Self {
            files: snapshot.records.clone(),
            valid: snapshot
                .records
                .iter()
                .filter(|r| r.status == FileStatus::Valid)
                .count(),
            rejected,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PackReport {
    pub archive: PathBuf,
    pub size: u64,
    pub entries: Vec<String>,
    #[serde(flatten)]
    pub intake: IntakeReport,
}

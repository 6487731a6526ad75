//! Configuration module
//!
//! [`FileBoxConfig`] holds the intake limits, allow-lists and scanner settings.
//! Every field is optional in serialized form and merges over the defaults, so a
//! partial JSON document such as `{"maxFiles": 5}` is a complete configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use validator::Validate;

use crate::constants::{
    allowed_extensions, allowed_mime_types, CONCURRENT_SCAN_LIMIT, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_TOTAL_SIZE, DEFAULT_SCAN_TIMEOUT_MS, UNLIMITED_FILES,
};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Screener settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerConfig {
    pub enabled: bool,
    /// Optional remote scanning service receiving each file as multipart upload.
    #[serde(alias = "remote_endpoint")]
    #[validate(url(message = "Remote scan endpoint must be a valid URL"))]
    pub remote_endpoint: Option<String>,
    #[validate(range(
        min = 1,
        max = 600_000,
        message = "Scan timeout must be between 1 ms and 10 minutes"
    ))]
    #[serde(alias = "timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote_endpoint: None,
            timeout_ms: DEFAULT_SCAN_TIMEOUT_MS,
        }
    }
}

/// Intake configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct FileBoxConfig {
    /// Per-file size limit in bytes.
    #[validate(range(min = 1, message = "Maximum file size must be positive"))]
    #[serde(alias = "max_file_size")]
    pub max_file_size: u64,
    /// Aggregate size limit in bytes across every admitted file.
    #[validate(range(min = 1, message = "Maximum total size must be positive"))]
    #[serde(alias = "max_total_size")]
    pub max_total_size: u64,
    /// Maximum number of files in the session; `<= 0` means unlimited.
    #[serde(alias = "max_files")]
    pub max_files: i64,
    /// Dotted, lowercase extensions (".pdf").
    #[serde(alias = "allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Exact MIME types or category wildcards ("image/*").
    #[serde(alias = "allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    #[validate(nested)]
    pub scanner: ScannerConfig,
    /// Screenings allowed in flight at once.
    #[validate(range(min = 1, max = 64, message = "Concurrency must be between 1 and 64"))]
    pub concurrency: usize,
}

impl Default for FileBoxConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            max_files: UNLIMITED_FILES,
            allowed_extensions: allowed_extensions(),
            allowed_mime_types: allowed_mime_types(),
            scanner: ScannerConfig::default(),
            concurrency: CONCURRENT_SCAN_LIMIT,
        }
    }
}

impl FileBoxConfig {
    /// Load configuration from `FILEBOX_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let defaults = Self::default();

        let max_file_size =
            env_parse::<u64>("FILEBOX_MAX_FILE_SIZE_MB", defaults.max_file_size / BYTES_PER_MB)?
                .saturating_mul(BYTES_PER_MB);
        let max_total_size =
            env_parse::<u64>("FILEBOX_MAX_TOTAL_SIZE_MB", defaults.max_total_size / BYTES_PER_MB)?
                .saturating_mul(BYTES_PER_MB);

        let allowed_extensions = env::var("FILEBOX_ALLOWED_EXTENSIONS")
            .ok()
            .map(|s| parse_list(&s))
            .unwrap_or(defaults.allowed_extensions);

        let allowed_mime_types = env::var("FILEBOX_ALLOWED_MIME_TYPES")
            .ok()
            .map(|s| parse_list(&s))
            .unwrap_or(defaults.allowed_mime_types);

        let scanner = ScannerConfig {
            enabled: env::var("FILEBOX_SCAN_ENABLED")
                .unwrap_or_else(|_| defaults.scanner.enabled.to_string())
                .to_lowercase()
                .parse()
                .map_err(|_| anyhow::anyhow!("FILEBOX_SCAN_ENABLED must be true or false"))?,
            remote_endpoint: env::var("FILEBOX_SCAN_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            timeout_ms: env_parse("FILEBOX_SCAN_TIMEOUT_MS", defaults.scanner.timeout_ms)?,
        };

        Ok(Self {
            max_file_size,
            max_total_size,
            max_files: env_parse("FILEBOX_MAX_FILES", defaults.max_files)?,
            allowed_extensions,
            allowed_mime_types,
            scanner,
            concurrency: defaults.concurrency,
        })
    }

    /// Parse a (possibly partial) JSON document merged over the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, anyhow::Error> {
        serde_json::from_str(json).context("Failed to parse FileBox configuration JSON")
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        Validate::validate(self).map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

        if self.max_file_size > self.max_total_size {
            return Err(anyhow::anyhow!(
                "maxFileSize ({}) must not exceed maxTotalSize ({})",
                self.max_file_size,
                self.max_total_size
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("allowedExtensions must not be empty"));
        }

        if self.allowed_mime_types.is_empty() {
            return Err(anyhow::anyhow!("allowedMimeTypes must not be empty"));
        }

        Ok(())
    }

    pub fn has_file_limit(&self) -> bool {
        self.max_files > 0
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr + ToString,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a valid number", key))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

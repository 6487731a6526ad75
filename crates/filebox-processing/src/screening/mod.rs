//! Heuristic file screening.
//!
//! [`Screener::screen`] runs the checks in a fixed order and stops at the first
//! failure: filename, magic-byte signature, text content, then the optional
//! remote scanner. It is fail-closed except for the text content read, which
//! passes on a read failure.

pub mod content;
pub mod filename;
pub mod signature;

use std::sync::Arc;
use std::time::{Duration, Instant};

use filebox_core::constants::{success_messages, SIGNATURE_HEADER_LEN};
use filebox_core::models::{FileSource, ScanResult};
use filebox_core::ScannerConfig;

use crate::upload::{RemoteScanner, TransportError};

pub use content::{find_suspicious_pattern, is_scannable_text};
pub use filename::{is_suspicious_filename, suspicious_filename_reason};
pub use signature::signature_matches;

pub const SUSPICIOUS_FILENAME: &str = "Suspicious filename detected";
pub const SIGNATURE_MISMATCH: &str = "File signature does not match extension";
pub const SUSPICIOUS_CONTENT: &str = "Suspicious content detected";

#[derive(Clone)]
pub struct Screener {
    config: ScannerConfig,
    remote: Option<Arc<dyn RemoteScanner>>,
}

impl Screener {
    /// Screener using local heuristics only.
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            remote: None,
        }
    }

    /// Attach the remote scanner used when an endpoint is configured.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteScanner>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub async fn screen(&self, file: &dyn FileSource) -> ScanResult {
        let start = Instant::now();
        let result = self.run_checks(file).await;

        match &result {
            ScanResult::Clean(details) => tracing::debug!(
                filename = %file.name(),
                details = %details,
                duration_ms = start.elapsed().as_millis(),
                "File screening passed"
            ),
            ScanResult::Infected(details) => tracing::warn!(
                filename = %file.name(),
                details = %details,
                duration_ms = start.elapsed().as_millis(),
                "File screening rejected file"
            ),
            ScanResult::Error(details) => tracing::error!(
                filename = %file.name(),
                error = %details,
                duration_ms = start.elapsed().as_millis(),
                "File screening failed"
            ),
        }

        result
    }

    async fn run_checks(&self, file: &dyn FileSource) -> ScanResult {
        if !self.config.enabled {
            return ScanResult::Clean(success_messages::SCAN_DISABLED.to_string());
        }

        if let Some(reason) = suspicious_filename_reason(file.name()) {
            tracing::debug!(filename = %file.name(), reason, "Filename heuristic failed");
            return ScanResult::Infected(SUSPICIOUS_FILENAME.to_string());
        }

        match file.read_head(SIGNATURE_HEADER_LEN).await {
            Ok(header) if signature_matches(file.name(), &header) => {}
            Ok(header) => {
                tracing::debug!(filename = %file.name(), header = ?&header[..], "Signature mismatch");
                return ScanResult::Infected(SIGNATURE_MISMATCH.to_string());
            }
            Err(e) => {
                tracing::debug!(filename = %file.name(), error = %e, "Could not read file header");
                return ScanResult::Infected(SIGNATURE_MISMATCH.to_string());
            }
        }

        if is_scannable_text(file.content_type(), file.size()) {
            match file.read_all().await {
                Ok(data) => {
                    let text = String::from_utf8_lossy(&data);
                    if let Some(pattern) = find_suspicious_pattern(&text) {
                        tracing::debug!(filename = %file.name(), pattern, "Content heuristic failed");
                        return ScanResult::Infected(SUSPICIOUS_CONTENT.to_string());
                    }
                }
                Err(e) => {
                    // The only fail-open step.
                    tracing::warn!(
                        filename = %file.name(),
                        error = %e,
                        "Could not read text content, skipping content scan"
                    );
                }
            }
        }

        if self.config.remote_endpoint.is_some() {
            return self.scan_remote(file).await;
        }

        ScanResult::clean()
    }

    async fn scan_remote(&self, file: &dyn FileSource) -> ScanResult {
        let Some(remote) = &self.remote else {
            return ScanResult::Error("Remote scanner not configured".to_string());
        };

        let data = match file.read_all().await {
            Ok(data) => data,
            Err(e) => return ScanResult::Error(format!("Failed to read file: {}", e)),
        };

        let timeout = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(timeout, remote.scan(file.name(), data)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => transport_failure(e),
            Err(_) => transport_failure(TransportError::Timeout(timeout)),
        }
    }
}

fn transport_failure(err: TransportError) -> ScanResult {
    ScanResult::Error(err.to_string())
}

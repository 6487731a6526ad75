//! Traits for the screening pipeline.

use async_trait::async_trait;
use bytes::Bytes;
use filebox_core::models::ScanResult;
use std::time::Duration;

/// Failures talking to a remote scanning service.
///
/// The screener never lets one of these become a clean verdict.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Scan timeout")]
    Timeout(Duration),

    #[error("Scan service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Scan request failed: {0}")]
    Request(String),

    #[error("Invalid scan service response: {0}")]
    InvalidResponse(String),
}

/// Optional remote scanner consulted after the local heuristics pass.
/// Implemented by `filebox-services`.
#[async_trait]
pub trait RemoteScanner: Send + Sync {
    async fn scan(&self, filename: &str, data: Bytes) -> Result<ScanResult, TransportError>;
}

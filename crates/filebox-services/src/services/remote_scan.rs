use async_trait::async_trait;
use bytes::Bytes;
use filebox_core::constants::success_messages;
use filebox_core::models::ScanResult;
use filebox_processing::{RemoteScanner, TransportError};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Verdict returned by a remote scanning endpoint.
///
/// Any of `isClean`, `safe` or `infected` carries the verdict; `details` (or
/// `message`) and `error` are optional explanations.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteScanResponse {
    #[serde(alias = "is_clean")]
    is_clean: Option<bool>,
    safe: Option<bool>,
    infected: Option<bool>,
    error: Option<String>,
    details: Option<String>,
    message: Option<String>,
}

impl RemoteScanResponse {
    fn into_scan_result(self) -> Result<ScanResult, TransportError> {
        if self.is_clean.is_none() && self.safe.is_none() && self.infected.is_none() {
            return Err(TransportError::InvalidResponse(
                "response has no isClean, safe or infected field".to_string(),
            ));
        }

        let clean = self.is_clean == Some(true)
            || self.safe == Some(true)
            || self.infected == Some(false);
        let details = self.details.or(self.message);

        if clean {
            Ok(ScanResult::Clean(
                details.unwrap_or_else(|| success_messages::SCAN_PASSED.to_string()),
            ))
        } else {
            Ok(ScanResult::Infected(details.or(self.error).unwrap_or_else(
                || "Remote scanner reported the file as infected".to_string(),
            )))
        }
    }
}

/// HTTP client for a remote scanning service.
///
/// Each file is POSTed as a multipart form with a single `file` field.
#[derive(Clone)]
pub struct HttpScanService {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpScanService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("filebox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build scan HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteScanner for HttpScanService {
    #[tracing::instrument(skip(self, data), fields(endpoint = %self.endpoint, size = data.len()))]
    async fn scan(&self, filename: &str, data: Bytes) -> Result<ScanResult, TransportError> {
        let start = Instant::now();

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(data.to_vec()).file_name(filename.to_string()),
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = %status, "Remote scan returned error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: RemoteScanResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::InvalidResponse(e.to_string())
            }
        })?;

        let result = body.into_scan_result()?;
        tracing::info!(
            clean = result.is_clean(),
            duration_ms = start.elapsed().as_millis(),
            "Remote scan completed"
        );
        Ok(result)
    }
}

pub mod fixtures;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use filebox_core::models::{FileHandle, FileSource};
use filebox_core::{FileBoxConfig, ScannerConfig};
use filebox_services::{IntakeController, IntakeEvent};
use tokio::sync::broadcast;

/// Text file whose every read takes `delay`, counting reads in flight.
#[derive(Debug)]
pub struct SlowFile {
    name: String,
    data: Bytes,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SlowFile {
    pub fn new(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            data: Bytes::from_static(b"slow but harmless"),
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Share read counters across several files.
    pub fn with_counters(mut self, in_flight: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Self {
        self.in_flight = in_flight;
        self.peak = peak;
        self
    }

    pub fn into_handle(self) -> FileHandle {
        Arc::new(self)
    }
}

#[async_trait]
impl FileSource for SlowFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn content_type(&self) -> &str {
        "text/plain"
    }

    async fn read_all(&self) -> io::Result<Bytes> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }
}

/// Default limits with local screening only.
pub fn local_config() -> FileBoxConfig {
    FileBoxConfig::default()
}

/// Default limits, screening delegated to `endpoint` after the local checks.
pub fn remote_config(endpoint: String, timeout_ms: u64) -> FileBoxConfig {
    FileBoxConfig {
        scanner: ScannerConfig {
            enabled: true,
            remote_endpoint: Some(endpoint),
            timeout_ms,
        },
        ..Default::default()
    }
}

pub fn controller(config: FileBoxConfig) -> IntakeController {
    IntakeController::new(config).expect("valid test configuration")
}

/// Events published so far, without waiting for more.
pub fn drain_events(rx: &mut broadcast::Receiver<IntakeEvent>) -> Vec<IntakeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

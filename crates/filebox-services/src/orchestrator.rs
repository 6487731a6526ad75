use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use filebox_core::models::{FileRecord, FileStatus, ScanResult};
use filebox_processing::Screener;
use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::Semaphore;

/// Runs the [`Screener`] over many records with a bounded number in flight.
#[derive(Clone)]
pub struct ScanOrchestrator {
    screener: Arc<Screener>,
    concurrency: usize,
}

impl ScanOrchestrator {
    pub fn new(screener: Arc<Screener>, concurrency: usize) -> Self {
        Self {
            screener,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn screener(&self) -> &Screener {
        &self.screener
    }

    /// Screen every non-terminal record, at most `concurrency` at a time.
    ///
    /// `on_progress` sees each screened record twice: once in `Scanning`, once
    /// in its final status. Terminal records pass through untouched and the
    /// output keeps the input order.
    #[tracing::instrument(
        skip(self, records, on_progress),
        fields(records = records.len(), concurrency = self.concurrency)
    )]
    pub async fn scan_many<F>(&self, records: Vec<FileRecord>, on_progress: F) -> Vec<FileRecord>
    where
        F: Fn(&FileRecord) + Send + Sync,
    {
        let semaphore = Semaphore::new(self.concurrency);
        let on_progress = &on_progress;
        let semaphore = &semaphore;

        let tasks = records.into_iter().map(|record| async move {
            if record.status.is_terminal() {
                return record;
            }
            let Ok(_permit) = semaphore.acquire().await else {
                return record;
            };
            self.scan_one(record, on_progress).await
        });

        join_all(tasks).await
    }

    async fn scan_one<F>(&self, record: FileRecord, on_progress: &F) -> FileRecord
    where
        F: Fn(&FileRecord) + Send + Sync,
    {
        let record = if record.status == FileStatus::Scanning {
            record
        } else {
            let snapshot = record.clone();
            match record.advance(FileStatus::Scanning) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(file_id = %snapshot.id, error = %e, "Record cannot be screened");
                    return snapshot;
                }
            }
        };
        on_progress(&record);

        let result = AssertUnwindSafe(self.screener.screen(record.handle.as_ref()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unexpected scanner failure".to_string());
                ScanResult::Error(detail)
            });

        let snapshot = record.clone();
        let finished = match result.rejection_reason() {
            None => record.advance(FileStatus::Valid),
            Some(reason) => record.fail(FileStatus::Infected, reason),
        };
        let finished = match finished {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(file_id = %snapshot.id, error = %e, "Could not record scan result");
                snapshot
            }
        };

        on_progress(&finished);
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use filebox_core::models::{FileSource, InMemoryFile};
    use filebox_core::ScannerConfig;
    use std::io;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct PanickingFile;

    #[async_trait]
    impl FileSource for PanickingFile {
        fn name(&self) -> &str {
            "boom.txt"
        }
        fn size(&self) -> u64 {
            4
        }
        fn content_type(&self) -> &str {
            "text/plain"
        }
        async fn read_all(&self) -> io::Result<Bytes> {
            panic!("disk vanished")
        }
    }

    fn orchestrator() -> ScanOrchestrator {
        ScanOrchestrator::new(Arc::new(Screener::new(ScannerConfig::default())), 3)
    }

    fn validating(name: &str, content: &'static str) -> FileRecord {
        FileRecord::new(InMemoryFile::new(name, "text/plain", content).into_handle())
            .advance(FileStatus::Validating)
            .unwrap()
    }

    #[tokio::test]
    async fn test_terminal_records_pass_through() {
        let invalid = FileRecord::new(InMemoryFile::new("big.txt", "text/plain", "x").into_handle())
            .fail(FileStatus::Invalid, "File is empty")
            .unwrap();
        let seen = Mutex::new(Vec::new());

        let out = orchestrator()
            .scan_many(vec![invalid.clone(), validating("ok.txt", "hi")], |r| {
                seen.lock().unwrap().push((r.name().to_string(), r.status))
            })
            .await;

        assert_eq!(out[0].status, FileStatus::Invalid);
        assert_eq!(out[0].id, invalid.id);
        assert_eq!(out[1].status, FileStatus::Valid);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("ok.txt".to_string(), FileStatus::Scanning),
                ("ok.txt".to_string(), FileStatus::Valid),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_record() {
        let records = vec![
            validating("a.txt", "fine"),
            validating(".hidden.txt", "fine"),
            validating("b.txt", "<script>x</script>"),
            validating("c.txt", "fine"),
        ];
        let out = orchestrator().scan_many(records, |_| {}).await;

        let statuses: Vec<FileStatus> = out.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                FileStatus::Valid,
                FileStatus::Infected,
                FileStatus::Infected,
                FileStatus::Valid
            ]
        );
        assert_eq!(
            out[1].error.as_deref(),
            Some("File failed security scan: Suspicious filename detected")
        );
        assert!(out[0].error.is_none());
    }

    #[tokio::test]
    async fn test_panicking_screen_fails_closed() {
        let record = FileRecord::new(Arc::new(PanickingFile))
            .advance(FileStatus::Validating)
            .unwrap();
        let out = orchestrator()
            .scan_many(vec![record, validating("ok.txt", "hi")], |_| {})
            .await;

        assert_eq!(out[0].status, FileStatus::Infected);
        assert_eq!(
            out[0].error.as_deref(),
            Some("Error occurred during file scanning: disk vanished")
        );
        assert_eq!(out[1].status, FileStatus::Valid);
    }

    #[tokio::test]
    async fn test_pending_record_is_screened() {
        let pending = FileRecord::new(InMemoryFile::new("a.txt", "text/plain", "hi").into_handle());
        let out = orchestrator().scan_many(vec![pending], |_| {}).await;
        assert_eq!(out[0].status, FileStatus::Valid);
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let o = ScanOrchestrator::new(Arc::new(Screener::new(ScannerConfig::default())), 0);
        assert_eq!(o.concurrency(), 1);
    }
}

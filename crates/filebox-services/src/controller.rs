use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use filebox_core::models::{FileHandle, FileId, FileRecord, FileStatus};
use filebox_core::{AppError, ErrorMetadata, FileBoxConfig};
use filebox_infra::{create_archive, ArchiveFormat, ArchiveOutput};
use filebox_processing::Screener;
use tokio::sync::{broadcast, watch};

use crate::events::{IntakeEvent, RejectedFile};
use crate::orchestrator::ScanOrchestrator;
use crate::session::{IntakeSession, SessionSnapshot};

const EVENT_CHANNEL_CAPACITY: usize = 64;

type CompletionCallback = Arc<dyn Fn(&ArchiveOutput) + Send + Sync>;

/// Result of handing a batch to [`IntakeController::files_added`].
#[derive(Debug, Clone, Default)]
pub struct AddOutcome {
    pub queued: Vec<FileId>,
    pub rejected: Vec<RejectedFile>,
}

struct Inner {
    session: Mutex<IntakeSession>,
    orchestrator: ScanOrchestrator,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    events_tx: broadcast::Sender<IntakeEvent>,
    archive_format: Mutex<ArchiveFormat>,
    on_complete: Mutex<Option<CompletionCallback>>,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, IntakeSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &IntakeSession) {
        self.snapshot_tx.send_replace(session.snapshot());
    }

    fn emit(&self, event: IntakeEvent) {
        tracing::debug!(event = %event.message(), "Intake event");
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }
}

/// Entry point for a presentation layer.
///
/// Owns one intake session: `files_added` validates a batch and screens the
/// survivors in the background, `remove_file` and `reset` edit the session,
/// and `create_archive` packs every `Valid` file. State changes are published
/// as [`SessionSnapshot`]s on a watch channel and as [`IntakeEvent`]s on a
/// broadcast channel.
#[derive(Clone)]
pub struct IntakeController {
    inner: Arc<Inner>,
}

impl IntakeController {
    /// Build a controller from configuration, attaching the HTTP scanner when
    /// a remote endpoint is configured.
    pub fn new(config: FileBoxConfig) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        let screener = build_screener(&config)?;
        Ok(Self::with_screener(config, screener))
    }

    /// Build a controller around a preconfigured screener.
    pub fn with_screener(config: FileBoxConfig, screener: Screener) -> Self {
        let orchestrator = ScanOrchestrator::new(Arc::new(screener), config.concurrency);
        let session = IntakeSession::new(config);
        let (snapshot_tx, _) = watch::channel(session.snapshot());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                orchestrator,
                snapshot_tx,
                events_tx,
                archive_format: Mutex::new(ArchiveFormat::default()),
                on_complete: Mutex::new(None),
            }),
        }
    }

    pub fn set_archive_format(&self, format: ArchiveFormat) {
        *self
            .inner
            .archive_format
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = format;
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        *self
            .inner
            .archive_format
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the callback fired once per successful archive.
    pub fn set_on_complete<F>(&self, callback: F)
    where
        F: Fn(&ArchiveOutput) + Send + Sync + 'static,
    {
        *self
            .inner
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<IntakeEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.session().snapshot()
    }

    /// Validate a batch, record it, and start screening the files that passed.
    ///
    /// Must be called from within a Tokio runtime; screening runs on a spawned
    /// task and reports through the snapshot channel.
    pub fn files_added(&self, batch: Vec<FileHandle>) -> Result<AddOutcome, AppError> {
        if batch.is_empty() {
            return Ok(AddOutcome::default());
        }
        let names: Vec<String> = batch.iter().map(|f| f.name().to_string()).collect();

        let admission = {
            let mut session = self.inner.session();
            match session.admit(batch) {
                Ok(admission) => {
                    self.inner.publish(&session);
                    admission
                }
                Err(e) => {
                    drop(session);
                    tracing::info!(files = names.len(), error = %e, "Batch refused");
                    let reason = e.client_message();
                    self.inner.emit(IntakeEvent::FilesRejected {
                        files: names
                            .into_iter()
                            .map(|name| RejectedFile {
                                name,
                                reason: reason.clone(),
                            })
                            .collect(),
                    });
                    return Err(e);
                }
            }
        };

        if !admission.rejected.is_empty() {
            self.inner.emit(IntakeEvent::FilesRejected {
                files: admission.rejected.clone(),
            });
        }

        let outcome = AddOutcome {
            queued: admission.queued.iter().map(|r| r.id.clone()).collect(),
            rejected: admission.rejected,
        };

        if !admission.queued.is_empty() {
            self.inner.emit(IntakeEvent::FilesQueued {
                count: admission.queued.len(),
            });
            tokio::spawn(run_scan(
                self.inner.clone(),
                admission.epoch,
                admission.queued,
            ));
        }

        Ok(outcome)
    }

    /// Resolves once no screening or archive creation is in flight.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| !s.scanning && !s.creating).await;
    }

    pub fn remove_file(&self, id: &FileId) -> Result<(), AppError> {
        let removed = {
            let mut session = self.inner.session();
            let removed = session.remove(id)?;
            self.inner.publish(&session);
            removed
        };
        tracing::debug!(file_id = %removed.id, filename = %removed.name(), "File removed");
        self.inner.emit(IntakeEvent::FileRemoved {
            id: removed.id.clone(),
            name: removed.name().to_string(),
        });
        Ok(())
    }

    /// Discard every record. In-flight work finishes in the background and
    /// its results are dropped.
    pub fn reset(&self) {
        {
            let mut session = self.inner.session();
            session.reset();
            self.inner.publish(&session);
        }
        self.inner.emit(IntakeEvent::SessionReset);
    }

    /// Pack every `Valid` file into one archive.
    ///
    /// On success the completion callback fires and the session is reset. On
    /// failure the session is left as it was so the caller may retry.
    pub async fn create_archive(&self) -> Result<ArchiveOutput, AppError> {
        let (epoch, handles) = {
            let mut session = self.inner.session();
            let started = session.begin_archive()?;
            self.inner.publish(&session);
            started
        };

        let progress_inner = self.inner.clone();
        let result = create_archive(self.archive_format(), &handles, move |progress| {
            let mut session = progress_inner.session();
            if session.set_archive_progress(epoch, progress) {
                progress_inner.publish(&session);
            }
        })
        .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                let err = AppError::from(e);
                tracing::error!(error = %err, "Archive creation failed");
                {
                    let mut session = self.inner.session();
                    session.finish_archive(epoch);
                    self.inner.publish(&session);
                }
                self.inner.emit(IntakeEvent::ArchiveFailed {
                    reason: err.client_message(),
                });
                return Err(err);
            }
        };

        if self.inner.session().epoch() != epoch {
            tracing::info!("Session reset during archive creation, discarding archive");
            return Err(AppError::Archive(
                "Session was reset during archive creation".to_string(),
            ));
        }

        let callback = self
            .inner
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(&output);
        }

        self.inner.emit(IntakeEvent::ArchiveCreated {
            entries: output.names.clone(),
            size: output.bytes.len() as u64,
        });

        {
            let mut session = self.inner.session();
            if session.epoch() == epoch {
                session.reset();
                self.inner.publish(&session);
            }
        }
        self.inner.emit(IntakeEvent::SessionReset);

        Ok(output)
    }
}

#[cfg(feature = "remote-scan")]
fn build_screener(config: &FileBoxConfig) -> Result<Screener, AppError> {
    let screener = Screener::new(config.scanner.clone());
    match &config.scanner.remote_endpoint {
        Some(endpoint) => {
            let timeout = std::time::Duration::from_millis(config.scanner.timeout_ms);
            let service = crate::services::HttpScanService::new(endpoint.clone(), timeout)?;
            Ok(screener.with_remote(Arc::new(service)))
        }
        None => Ok(screener),
    }
}

#[cfg(not(feature = "remote-scan"))]
fn build_screener(config: &FileBoxConfig) -> Result<Screener, AppError> {
    if config.scanner.remote_endpoint.is_some() {
        tracing::warn!("Remote scan endpoint configured but remote-scan feature is disabled");
    }
    Ok(Screener::new(config.scanner.clone()))
}

async fn run_scan(inner: Arc<Inner>, epoch: u64, queued: Vec<FileRecord>) {
    let progress_inner = inner.clone();
    let results = inner
        .orchestrator
        .scan_many(queued, move |record| {
            let mut session = progress_inner.session();
            if session.apply_update(epoch, record) {
                progress_inner.publish(&session);
            }
        })
        .await;

    let clean = results
        .iter()
        .filter(|r| r.status == FileStatus::Valid)
        .count();
    let infected: Vec<RejectedFile> = results
        .iter()
        .filter(|r| r.status == FileStatus::Infected)
        .map(|r| RejectedFile {
            name: r.name().to_string(),
            reason: r.error.clone().unwrap_or_default(),
        })
        .collect();

    let mut session = inner.session();
    if !session.finish_scan(epoch, &results) {
        tracing::debug!(epoch, "Session reset during scan, results dropped");
        return;
    }

    tracing::info!(clean, infected = infected.len(), "Screening finished");
    // Emitted before the idle snapshot so waiters see the event first.
    inner.emit(IntakeEvent::ScanFinished { clean, infected });
    inner.publish(&session);
}

mod helpers;

use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filebox_core::models::{DiskFile, FileRecord, FileStatus};
use filebox_core::{AppError, FileBoxConfig, ScannerConfig};
use filebox_infra::ArchiveFormat;
use filebox_processing::Screener;
use filebox_services::{IntakeController, IntakeEvent, ScanOrchestrator};
use helpers::fixtures::{file, pdf_bytes, plain_text, png_bytes, sized_file, text_file};
use helpers::{controller, drain_events, local_config, remote_config, SlowFile};

fn zip_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn zip_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

fn status_of(controller: &IntakeController, name: &str) -> (FileStatus, Option<String>) {
    let snapshot = controller.snapshot();
    let record = snapshot
        .records
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no record named {}", name));
    (record.status, record.error.clone())
}

#[tokio::test]
async fn test_oversized_file_is_left_out_of_archive() {
    let controller = controller(local_config());
    let completions = Arc::new(AtomicUsize::new(0));
    let seen = completions.clone();
    controller.set_on_complete(move |output| {
        assert_eq!(output.names, vec!["notes.txt".to_string()]);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let notes = plain_text(2048);
    let outcome = controller
        .files_added(vec![
            text_file("notes.txt", &notes),
            sized_file("movie.mp4", "video/mp4", 20 * 1024 * 1024),
        ])
        .unwrap();
    assert_eq!(outcome.queued.len(), 1);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].name, "movie.mp4");

    controller.wait_until_idle().await;

    assert_eq!(status_of(&controller, "notes.txt"), (FileStatus::Valid, None));
    let (status, error) = status_of(&controller, "movie.mp4");
    assert_eq!(status, FileStatus::Invalid);
    assert_eq!(
        error.as_deref(),
        Some("File size exceeds the maximum allowed size (10 MB)")
    );
    assert!(controller.snapshot().can_create_archive);

    let output = controller.create_archive().await.unwrap();
    assert_eq!(output.names, vec!["notes.txt".to_string()]);
    assert_eq!(zip_names(&output.bytes), vec!["notes.txt".to_string()]);
    assert_eq!(zip_entry(&output.bytes, "notes.txt"), notes.as_bytes());
    assert_eq!(completions.load(Ordering::SeqCst), 1);

    // A successful archive closes the session.
    let snapshot = controller.snapshot();
    assert!(snapshot.records.is_empty());
    assert!(!snapshot.creating);
    assert!(!snapshot.can_create_archive);
}

#[tokio::test]
async fn test_dangerous_double_extension_is_infected() {
    let controller = controller(local_config());
    controller
        .files_added(vec![file("invoice.exe.pdf", "application/pdf", pdf_bytes())])
        .unwrap();
    controller.wait_until_idle().await;

    let (status, error) = status_of(&controller, "invoice.exe.pdf");
    assert_eq!(status, FileStatus::Infected);
    assert_eq!(
        error.as_deref(),
        Some("File failed security scan: Suspicious filename detected")
    );
    assert_eq!(controller.snapshot().valid_file_count, 0);
}

#[tokio::test]
async fn test_signature_mismatch_and_text_exemption() {
    let controller = controller(local_config());
    controller
        .files_added(vec![
            file("x.png", "image/png", b"GIF89a-not-a-png".to_vec()),
            file("y.png", "image/png", png_bytes()),
            file("x.txt", "text/plain", b"GIF89a but plain text".to_vec()),
        ])
        .unwrap();
    controller.wait_until_idle().await;

    let (status, error) = status_of(&controller, "x.png");
    assert_eq!(status, FileStatus::Infected);
    assert_eq!(
        error.as_deref(),
        Some("File failed security scan: File signature does not match extension")
    );
    assert_eq!(status_of(&controller, "y.png").0, FileStatus::Valid);
    assert_eq!(status_of(&controller, "x.txt").0, FileStatus::Valid);
}

#[tokio::test]
async fn test_orchestrator_bounds_concurrency_and_keeps_order() {
    let orchestrator =
        ScanOrchestrator::new(Arc::new(Screener::new(ScannerConfig::default())), 3);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let records: Vec<FileRecord> = (0..10)
        .map(|i| {
            let handle = SlowFile::new(&format!("file{}.txt", i), Duration::from_millis(20))
                .with_counters(in_flight.clone(), peak.clone())
                .into_handle();
            FileRecord::new(handle).advance(FileStatus::Validating).unwrap()
        })
        .collect();
    let ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();

    let scanning = Mutex::new(0usize);
    let max_scanning = Mutex::new(0usize);
    let out = orchestrator
        .scan_many(records, |record| {
            let mut current = scanning.lock().unwrap();
            if record.status == FileStatus::Scanning {
                *current += 1;
            } else {
                *current -= 1;
            }
            let mut max = max_scanning.lock().unwrap();
            *max = (*max).max(*current);
        })
        .await;

    assert_eq!(out.len(), 10);
    assert_eq!(out.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), ids);
    assert!(out.iter().all(|r| r.status == FileStatus::Valid));
    assert_eq!(*max_scanning.lock().unwrap(), 3);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(*scanning.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_fewer_files_than_workers_all_start() {
    let orchestrator =
        ScanOrchestrator::new(Arc::new(Screener::new(ScannerConfig::default())), 3);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let records: Vec<FileRecord> = (0..2)
        .map(|i| {
            let handle = SlowFile::new(&format!("f{}.txt", i), Duration::from_millis(30))
                .with_counters(in_flight.clone(), peak.clone())
                .into_handle();
            FileRecord::new(handle).advance(FileStatus::Validating).unwrap()
        })
        .collect();

    let out = orchestrator.scan_many(records, |_| {}).await;
    assert_eq!(out.len(), 2);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_duplicate_names_get_suffixes() {
    let controller = controller(local_config());
    controller
        .files_added(vec![
            text_file("a.txt", "first"),
            text_file("a.txt", "second"),
            text_file("report.txt", "third"),
        ])
        .unwrap();
    controller.wait_until_idle().await;

    let output = controller.create_archive().await.unwrap();
    assert_eq!(output.names, vec!["a.txt", "a_1.txt", "report.txt"]);
    assert_eq!(zip_entry(&output.bytes, "a.txt"), b"first");
    assert_eq!(zip_entry(&output.bytes, "a_1.txt"), b"second");
}

#[tokio::test]
async fn test_tar_gz_archive() {
    let controller = controller(local_config());
    controller.set_archive_format(ArchiveFormat::TarGz);
    controller
        .files_added(vec![text_file("a.txt", "alpha"), text_file("b.txt", "beta")])
        .unwrap();
    controller.wait_until_idle().await;

    let output = controller.create_archive().await.unwrap();
    assert_eq!(output.format, ArchiveFormat::TarGz);

    let decoder = flate2::read::GzDecoder::new(Cursor::new(output.bytes.to_vec()));
    let mut archive = tar::Archive::new(decoder);
    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_file_count_limit_refuses_batch() {
    let controller = controller(FileBoxConfig {
        max_files: 2,
        ..local_config()
    });
    let mut events = controller.events();

    let err = controller
        .files_added(vec![
            text_file("a.txt", "a"),
            text_file("b.txt", "b"),
            text_file("c.txt", "c"),
        ])
        .unwrap_err();
    assert!(matches!(err, AppError::FileCountExceeded { max: 2, .. }));
    assert!(controller.snapshot().records.is_empty());

    match drain_events(&mut events).as_slice() {
        [IntakeEvent::FilesRejected { files }] => {
            assert_eq!(files.len(), 3);
            assert_eq!(files[0].reason, "Maximum number of files exceeded");
        }
        other => panic!("unexpected events {:?}", other),
    }
}

#[tokio::test]
async fn test_remove_rules() {
    let controller = controller(local_config());
    let outcome = controller
        .files_added(vec![SlowFile::new("slow.txt", Duration::from_millis(100)).into_handle()])
        .unwrap();
    let id = outcome.queued[0].clone();

    assert!(matches!(controller.remove_file(&id), Err(AppError::Busy(_))));
    assert!(matches!(
        controller.remove_file(&"missing".into()),
        Err(AppError::NotFound(_))
    ));

    controller.wait_until_idle().await;
    let mut events = controller.events();
    controller.remove_file(&id).unwrap();
    assert!(controller.snapshot().records.is_empty());
    assert!(matches!(
        drain_events(&mut events).as_slice(),
        [IntakeEvent::FileRemoved { name, .. }] if name == "slow.txt"
    ));
}

#[tokio::test]
async fn test_reset_discards_in_flight_results() {
    let controller = controller(local_config());
    controller
        .files_added(vec![SlowFile::new("slow.txt", Duration::from_millis(50)).into_handle()])
        .unwrap();
    assert!(controller.snapshot().scanning);

    controller.reset();
    assert!(controller.snapshot().records.is_empty());
    assert!(!controller.snapshot().scanning);

    // Let the orphaned scan finish.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let snapshot = controller.snapshot();
    assert!(snapshot.records.is_empty());
    assert_eq!(snapshot.valid_file_count, 0);
}

#[tokio::test]
async fn test_snapshot_channel_follows_session() {
    let controller = controller(local_config());
    let mut rx = controller.subscribe();

    controller
        .files_added(vec![text_file("a.txt", "alpha")])
        .unwrap();
    rx.wait_for(|s| s.valid_file_count == 1 && !s.scanning)
        .await
        .unwrap();

    let output = controller.create_archive().await.unwrap();
    assert_eq!(output.names, vec!["a.txt"]);
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().records.is_empty());
}

#[tokio::test]
async fn test_remote_scanner_clean() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/scan")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"isClean": true, "details": "No threats found"}"#)
        .create_async()
        .await;

    let controller = controller(remote_config(format!("{}/scan", server.url()), 5_000));
    controller
        .files_added(vec![text_file("notes.txt", "hello")])
        .unwrap();
    controller.wait_until_idle().await;

    assert_eq!(status_of(&controller, "notes.txt"), (FileStatus::Valid, None));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_scanner_infected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/scan")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"infected": true, "details": "EICAR-Test-Signature"}"#)
        .create_async()
        .await;

    let controller = controller(remote_config(format!("{}/scan", server.url()), 5_000));
    controller
        .files_added(vec![text_file("notes.txt", "hello")])
        .unwrap();
    controller.wait_until_idle().await;

    assert_eq!(
        status_of(&controller, "notes.txt"),
        (
            FileStatus::Infected,
            Some("File failed security scan: EICAR-Test-Signature".to_string())
        )
    );
}

#[tokio::test]
async fn test_remote_scanner_error_status_fails_closed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/scan")
        .with_status(500)
        .with_body("scanner crashed")
        .create_async()
        .await;

    let controller = controller(remote_config(format!("{}/scan", server.url()), 5_000));
    controller
        .files_added(vec![text_file("notes.txt", "hello")])
        .unwrap();
    controller.wait_until_idle().await;

    let (status, error) = status_of(&controller, "notes.txt");
    assert_eq!(status, FileStatus::Infected);
    let error = error.unwrap();
    assert!(error.starts_with("Error occurred during file scanning"));
    assert!(error.contains("500"));
}

#[tokio::test]
async fn test_remote_scanner_without_verdict_fails_closed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/scan")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"details": "looks fine"}"#)
        .create_async()
        .await;

    let controller = controller(remote_config(format!("{}/scan", server.url()), 5_000));
    controller
        .files_added(vec![text_file("notes.txt", "hello")])
        .unwrap();
    controller.wait_until_idle().await;

    let (status, error) = status_of(&controller, "notes.txt");
    assert_eq!(status, FileStatus::Infected);
    assert!(error
        .unwrap()
        .starts_with("Error occurred during file scanning: Invalid scan service response"));
}

#[tokio::test]
async fn test_remote_scanner_timeout() {
    // Accepts connections at the socket level but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/scan", listener.local_addr().unwrap());

    let controller = controller(remote_config(endpoint, 200));
    controller
        .files_added(vec![text_file("notes.txt", "hello")])
        .unwrap();
    controller.wait_until_idle().await;

    assert_eq!(
        status_of(&controller, "notes.txt"),
        (
            FileStatus::Infected,
            Some("Error occurred during file scanning: Scan timeout".to_string())
        )
    );
    drop(listener);
}

#[tokio::test]
async fn test_local_rejection_skips_remote() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/scan")
        .with_status(200)
        .with_body(r#"{"isClean": true}"#)
        .expect(0)
        .create_async()
        .await;

    let controller = controller(remote_config(format!("{}/scan", server.url()), 5_000));
    controller
        .files_added(vec![text_file(".env.txt", "SECRET")])
        .unwrap();
    controller.wait_until_idle().await;

    assert_eq!(status_of(&controller, ".env.txt").0, FileStatus::Infected);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_scan_finished_event_lists_infected_files() {
    let controller = controller(local_config());
    let mut events = controller.events();
    controller
        .files_added(vec![
            text_file("ok.txt", "fine"),
            text_file("page.txt", "<script>steal()</script>"),
        ])
        .unwrap();
    controller.wait_until_idle().await;

    let events = drain_events(&mut events);
    assert_eq!(events[0], IntakeEvent::FilesQueued { count: 2 });
    match events.last() {
        Some(IntakeEvent::ScanFinished { clean, infected }) => {
            assert_eq!(*clean, 1);
            assert_eq!(infected.len(), 1);
            assert_eq!(infected[0].name, "page.txt");
            assert_eq!(
                infected[0].reason,
                "File failed security scan: Suspicious content detected"
            );
        }
        other => panic!("unexpected final event {:?}", other),
    }
}

#[tokio::test]
async fn test_files_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    let image = dir.path().join("photo.png");
    let fake = dir.path().join("fake.pdf");
    std::fs::write(&notes, plain_text(512)).unwrap();
    std::fs::write(&image, png_bytes()).unwrap();
    std::fs::write(&fake, b"MZ\x90\x00 not a pdf").unwrap();

    let mut handles = Vec::new();
    for path in [&notes, &image, &fake] {
        handles.push(DiskFile::open(path).await.unwrap().into_handle());
    }

    let controller = controller(local_config());
    controller.files_added(handles).unwrap();
    controller.wait_until_idle().await;

    assert_eq!(status_of(&controller, "fake.pdf").0, FileStatus::Infected);
    let output = controller.create_archive().await.unwrap();
    assert_eq!(output.names, vec!["notes.txt", "photo.png"]);
    assert_eq!(zip_entry(&output.bytes, "photo.png"), png_bytes());
}

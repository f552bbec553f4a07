//! Behavior tests for the streaming downloader

use super::*;
use crate::config::FetchConfig;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::stream::part_path;

/// Captures every event a transfer emits.
#[derive(Clone, Default)]
struct EventCapture {
    events: Arc<Mutex<Vec<DownloadEvent>>>,
}

impl EventCapture {
    fn new() -> Self {
        Self::default()
    }

    fn sink(&self) -> impl Fn(DownloadEvent) + Send + Sync + use<> {
        let events = self.events.clone();
        move |event| events.lock().unwrap().push(event)
    }

    fn events(&self) -> Vec<DownloadEvent> {
        self.events.lock().unwrap().clone()
    }

    fn progress(&self) -> Vec<DownloadProgress> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DownloadEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn completed(&self) -> Vec<PathBuf> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DownloadEvent::Completed { path } => Some(path),
                _ => None,
            })
            .collect()
    }

    fn failed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DownloadEvent::Failed { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    fn cancelled_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DownloadEvent::Cancelled))
            .count()
    }
}

/// Small chunks keep the test bodies small while still exercising the
/// multi-chunk paths.
fn test_config() -> FetchConfig {
    FetchConfig {
        chunk_size: 1024,
        retry_delay: Duration::from_millis(5),
        max_retry_delay: Duration::from_millis(20),
        ..FetchConfig::default()
    }
}

async fn mount_body(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

#[test]
fn part_path_appends_to_the_full_filename() {
    assert_eq!(
        part_path(&PathBuf::from("/tmp/out/foo.zip")),
        PathBuf::from("/tmp/out/foo.zip.part")
    );
    assert_eq!(part_path(&PathBuf::from("plain")), PathBuf::from("plain.part"));
}

#[tokio::test]
async fn successful_download_writes_exact_bytes_and_reports_totals() {
    let server = MockServer::start().await;
    let body: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
    mount_body(&server, "/file.bin", body.clone()).await;

    let dir = tempdir().unwrap();
    let dest = dir.path().join("file.bin");
    let capture = EventCapture::new();
    let sink = capture.sink();

    download_with_progress(
        &test_config(),
        &format!("{}/file.bin", server.uri()),
        &dest,
        &CancellationToken::new(),
        &sink,
    )
    .await;

    assert_eq!(capture.completed(), vec![dest.clone()]);
    assert!(capture.failed().is_empty());
    assert_eq!(capture.cancelled_count(), 0);

    let written = tokio::fs::read(&dest).await.unwrap();
    assert_eq!(written, body);
    assert!(!part_path(&dest).exists());

    // 1024 + 1024 + 452 byte chunks.
    let progress = capture.progress();
    assert_eq!(progress.len(), 3);
    let last = progress.last().unwrap();
    assert_eq!(last.bytes_done, 2500);
    assert_eq!(last.bytes_total, Some(2500));
    // Monotonic byte counts.
    assert!(progress.windows(2).all(|w| w[0].bytes_done < w[1].bytes_done));
}

#[tokio::test]
async fn missing_content_length_leaves_total_unknown() {
    // Chunked transfer encoding: no Content-Length header on the wire.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                             800\r\n"
                .to_vec();
            let _ = socket.write_all(&response).await;
            let _ = socket.write_all(&vec![7u8; 0x800]).await;
            let _ = socket.write_all(b"\r\n0\r\n\r\n").await;
            let _ = socket.flush().await;
        }
    });

    let dir = tempdir().unwrap();
    let dest = dir.path().join("file.bin");
    let capture = EventCapture::new();
    let sink = capture.sink();

    download_with_progress(
        &test_config(),
        &format!("http://{addr}/file.bin"),
        &dest,
        &CancellationToken::new(),
        &sink,
    )
    .await;

    assert_eq!(capture.completed().len(), 1);
    let progress = capture.progress();
    assert!(!progress.is_empty());
    assert!(progress.iter().all(|p| p.bytes_total.is_none()));
    assert_eq!(tokio::fs::read(&dest).await.unwrap().len(), 0x800);
}

#[tokio::test]
async fn cancellation_removes_all_files_and_notifies_once() {
    let server = MockServer::start().await;
    // Three chunks; the token trips inside the first progress callback, so
    // the second chunk's boundary check observes it.
    mount_body(&server, "/big.bin", vec![1u8; 3 * 1024]).await;

    let dir = tempdir().unwrap();
    let dest = dir.path().join("big.bin");
    let capture = EventCapture::new();
    let cancel = CancellationToken::new();

    let sink = {
        let events = capture.events.clone();
        let cancel = cancel.clone();
        move |event: DownloadEvent| {
            if matches!(event, DownloadEvent::Progress(_)) {
                cancel.cancel();
            }
            events.lock().unwrap().push(event);
        }
    };

    download_with_progress(
        &test_config(),
        &format!("{}/big.bin", server.uri()),
        &dest,
        &cancel,
        &sink,
    )
    .await;

    assert_eq!(capture.cancelled_count(), 1);
    assert!(capture.completed().is_empty());
    assert!(capture.failed().is_empty());
    assert_eq!(capture.progress().len(), 1);
    assert!(!dest.exists());
    assert!(!part_path(&dest).exists());
}

#[tokio::test]
async fn http_error_status_reports_failure_without_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let dest = dir.path().join("gone.bin");
    let capture = EventCapture::new();
    let sink = capture.sink();

    download_with_progress(
        &test_config(),
        &format!("{}/gone.bin", server.uri()),
        &dest,
        &CancellationToken::new(),
        &sink,
    )
    .await;

    let failed = capture.failed();
    assert_eq!(failed.len(), 1);
    assert!(!failed[0].is_empty());
    assert!(capture.completed().is_empty());
    assert_eq!(capture.cancelled_count(), 0);
    assert!(!dest.exists());
    assert!(!part_path(&dest).exists());
}

#[tokio::test]
async fn mid_stream_transport_failure_reports_error_and_cleans_up() {
    // Advertise more bytes than are sent, then drop the connection.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let header = "HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\n";
            let _ = socket.write_all(header.as_bytes()).await;
            let _ = socket.write_all(&vec![0u8; 2048]).await;
            let _ = socket.flush().await;
            // Connection drops here, mid-body.
        }
    });

    let dir = tempdir().unwrap();
    let dest = dir.path().join("truncated.bin");
    let capture = EventCapture::new();
    let sink = capture.sink();

    download_with_progress(
        &test_config(),
        &format!("http://{addr}/truncated.bin"),
        &dest,
        &CancellationToken::new(),
        &sink,
    )
    .await;

    let failed = capture.failed();
    assert_eq!(failed.len(), 1);
    assert!(!failed[0].is_empty());
    assert!(capture.completed().is_empty());
    assert_eq!(capture.cancelled_count(), 0);
    assert!(!dest.exists());
    assert!(!part_path(&dest).exists());
}

#[tokio::test]
async fn creates_missing_parent_directories() {
    let server = MockServer::start().await;
    mount_body(&server, "/nested.bin", b"payload".to_vec()).await;

    let dir = tempdir().unwrap();
    let dest = dir.path().join("a").join("b").join("nested.bin");
    let capture = EventCapture::new();
    let sink = capture.sink();

    download_with_progress(
        &test_config(),
        &format!("{}/nested.bin", server.uri()),
        &dest,
        &CancellationToken::new(),
        &sink,
    )
    .await;

    assert_eq!(capture.completed().len(), 1);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"payload");
}

#[tokio::test]
async fn empty_body_completes_without_progress_events() {
    let server = MockServer::start().await;
    mount_body(&server, "/empty.bin", Vec::new()).await;

    let dir = tempdir().unwrap();
    let dest = dir.path().join("empty.bin");
    let capture = EventCapture::new();
    let sink = capture.sink();

    download_with_progress(
        &test_config(),
        &format!("{}/empty.bin", server.uri()),
        &dest,
        &CancellationToken::new(),
        &sink,
    )
    .await;

    assert_eq!(capture.completed().len(), 1);
    assert!(capture.progress().is_empty());
    assert_eq!(tokio::fs::metadata(&dest).await.unwrap().len(), 0);
}

//! Progress and terminal notifications for download operations

use std::path::{Path, PathBuf};

/// Bytes transferred so far. `bytes_total` stays `None` for the whole
/// transfer when the remote did not report a numeric `Content-Length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub bytes_done: u64,
    pub bytes_total: Option<u64>,
}

/// Everything a transfer can report. Exactly one of the terminal variants
/// (`Completed`, `Failed`, `Cancelled`) is emitted per download call.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Progress(DownloadProgress),
    Completed { path: PathBuf },
    Failed { message: String },
    Cancelled,
}

/// Sink the downloader pushes events into. Callers observe failures only
/// through `on_failed`; the download operation itself never returns an
/// error.
pub trait DownloadSink: Send + Sync {
    fn on_progress(&self, _progress: DownloadProgress) {}
    fn on_completed(&self, _path: &Path) {}
    fn on_failed(&self, _message: &str) {}
    fn on_cancelled(&self) {}
}

/// Any event closure is a sink, which keeps call sites and tests free of
/// adapter boilerplate.
impl<F> DownloadSink for F
where
    F: Fn(DownloadEvent) + Send + Sync,
{
    fn on_progress(&self, progress: DownloadProgress) {
        self(DownloadEvent::Progress(progress));
    }

    fn on_completed(&self, path: &Path) {
        self(DownloadEvent::Completed {
            path: path.to_path_buf(),
        });
    }

    fn on_failed(&self, message: &str) {
        self(DownloadEvent::Failed {
            message: message.to_string(),
        });
    }

    fn on_cancelled(&self) {
        self(DownloadEvent::Cancelled);
    }
}

/// Sink that swallows everything, for fire-and-forget transfers.
#[derive(Debug, Default)]
pub struct NullSink;

impl DownloadSink for NullSink {}

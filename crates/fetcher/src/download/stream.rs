//! Streaming, cancellable, crash-safe file download
//!
//! The body is streamed to a `<destination>.part` sibling in fixed-size
//! chunks and atomically renamed into place only after the full transfer
//! succeeded, so a cancelled or failed transfer can never replace a
//! previous good file. Cancellation is cooperative and takes effect at the
//! next chunk boundary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{FetchError, FileOperation, Result};
use crate::http::HttpClient;

use super::progress::{DownloadProgress, DownloadSink};

enum Outcome {
    Completed(u64),
    Cancelled,
}

/// Transfers `url` to `dest_path`, reporting through `sink`.
///
/// Exactly one terminal notification (`on_completed`, `on_failed`, or
/// `on_cancelled`) is made per call; errors are converted into the failed
/// notification instead of being returned. There is no body-level retry:
/// an interrupted stream surfaces as a failure, not a partial resume.
pub async fn download_with_progress(
    config: &FetchConfig,
    url: &str,
    dest_path: &Path,
    cancel: &CancellationToken,
    sink: &dyn DownloadSink,
) {
    let temp_path = part_path(dest_path);

    match transfer(config, url, dest_path, &temp_path, cancel, sink).await {
        Ok(Outcome::Completed(bytes)) => {
            debug!("download completed: {} ({} bytes)", dest_path.display(), bytes);
            sink.on_completed(dest_path);
        }
        Ok(Outcome::Cancelled) => {
            debug!("download cancelled: {url}");
            remove_partial(&temp_path).await;
            sink.on_cancelled();
        }
        Err(e) => {
            warn!("download failed: {url}: {e}");
            remove_partial(&temp_path).await;
            sink.on_failed(&e.to_string());
        }
    }
}

/// `foo.zip` becomes `foo.zip.part`; the suffix is appended to the full
/// filename, not swapped for the extension.
pub(crate) fn part_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    dest_path.with_file_name(name)
}

async fn remove_partial(temp_path: &Path) {
    // Best effort; a leftover .part never shadows the destination.
    if let Err(e) = fs::remove_file(temp_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove partial file {}: {e}", temp_path.display());
        }
    }
}

async fn transfer(
    config: &FetchConfig,
    url: &str,
    dest_path: &Path,
    temp_path: &Path,
    cancel: &CancellationToken,
    sink: &dyn DownloadSink,
) -> Result<Outcome> {
    if let Some(parent) = dest_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::local_io(parent, FileOperation::CreateDir, e))?;
        }
    }

    let client = HttpClient::for_streaming(config)?;
    let response = client.get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::upstream(url, format!("HTTP {status}")));
    }

    // Raw header only; a missing or non-numeric Content-Length leaves the
    // total unknown for the whole transfer.
    let bytes_total: Option<u64> = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|e| FetchError::local_io(temp_path, FileOperation::Create, e))?;

    // Network frames arrive at arbitrary sizes; coalesce them so the
    // cancel-check/write/progress cadence is one fixed-size chunk.
    let chunk_size = config.chunk_size.max(1);
    let mut buffer: Vec<u8> = Vec::with_capacity(chunk_size);
    let mut bytes_done: u64 = 0;
    let mut stream = response.bytes_stream();

    loop {
        let frame = stream.next().await;
        match frame {
            Some(Ok(bytes)) => {
                buffer.extend_from_slice(&bytes);
                while buffer.len() >= chunk_size {
                    let chunk: Vec<u8> = buffer.drain(..chunk_size).collect();
                    if write_chunk(&mut file, temp_path, &chunk, cancel, sink, &mut bytes_done, bytes_total)
                        .await?
                    {
                        return Ok(Outcome::Cancelled);
                    }
                }
            }
            Some(Err(e)) => {
                return Err(FetchError::Upstream {
                    url: url.to_string(),
                    detail: format!("stream interrupted: {e}"),
                    source: Some(e),
                });
            }
            None => break,
        }
    }

    if !buffer.is_empty() {
        let chunk = std::mem::take(&mut buffer);
        if write_chunk(&mut file, temp_path, &chunk, cancel, sink, &mut bytes_done, bytes_total).await? {
            return Ok(Outcome::Cancelled);
        }
    }

    file.flush()
        .await
        .map_err(|e| FetchError::local_io(temp_path, FileOperation::Write, e))?;
    file.sync_all()
        .await
        .map_err(|e| FetchError::local_io(temp_path, FileOperation::Write, e))?;
    drop(file);

    fs::rename(temp_path, dest_path)
        .await
        .map_err(|e| FetchError::local_io(dest_path, FileOperation::Rename, e))?;

    Ok(Outcome::Completed(bytes_done))
}

/// Writes one chunk and reports progress. Returns `true` when the
/// cancellation signal was observed instead, before anything was written.
async fn write_chunk(
    file: &mut fs::File,
    temp_path: &Path,
    chunk: &[u8],
    cancel: &CancellationToken,
    sink: &dyn DownloadSink,
    bytes_done: &mut u64,
    bytes_total: Option<u64>,
) -> Result<bool> {
    if cancel.is_cancelled() {
        return Ok(true);
    }

    file.write_all(chunk)
        .await
        .map_err(|e| FetchError::local_io(temp_path, FileOperation::Write, e))?;
    *bytes_done += chunk.len() as u64;
    sink.on_progress(DownloadProgress {
        bytes_done: *bytes_done,
        bytes_total,
    });
    Ok(false)
}

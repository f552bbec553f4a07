//! Streaming download with progress, cancellation, and atomic finalization

pub mod progress;
pub mod stream;

pub use progress::{DownloadEvent, DownloadProgress, DownloadSink, NullSink};
pub use stream::download_with_progress;

#[cfg(test)]
mod tests;

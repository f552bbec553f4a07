//! Build resolution and download library for LineageOS devices
//!
//! Given a device codename, this crate locates a downloadable artifact (ROM
//! package, recovery/boot image, or signing-metadata image) across three
//! independent backends and transfers it to local storage with progress
//! reporting, cooperative cancellation, and atomic finalization.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use fetcher::{download, resolver, FetchConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> fetcher::Result<()> {
//! let config = FetchConfig::default();
//!
//! // Resolve the newest nightly for a device.
//! let artifact = resolver::latest_nightly(&config, "redfin").await?;
//!
//! // Stream it to disk; outcomes arrive through the sink, never as errors.
//! let cancel = CancellationToken::new();
//! let sink = |event: fetcher::DownloadEvent| println!("{event:?}");
//! let dest = std::path::PathBuf::from(artifact.default_save_name("redfin"));
//! download::download_with_progress(&config, &artifact.url, &dest, &cancel, &sink).await;
//! # Ok(())
//! # }
//! ```

pub mod adb;
pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod resolver;

// Re-export commonly used types for convenience
pub use config::FetchConfig;
pub use download::{download_with_progress, DownloadEvent, DownloadProgress, DownloadSink, NullSink};
pub use error::{FetchError, FileOperation, Result};
pub use resolver::{ArtifactDescriptor, ArtifactSource, BuildRecord, ReleaseArtifact};

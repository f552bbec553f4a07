//! Error types for build resolution and downloads

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the locators, the prober, and the downloader.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The backend answered, but nothing matches the device/artifact.
    #[error("no {artifact} found for device '{device}': {detail}")]
    NotFound {
        device: String,
        artifact: String,
        detail: String,
    },

    /// Transport failure, unexpected response shape, or exhaustion of all
    /// candidate URLs.
    #[error("upstream request to '{url}' failed: {detail}")]
    Upstream {
        url: String,
        detail: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Directory, temp-file, or rename failure on the local filesystem.
    #[error("file operation failed on '{path}' while {operation}")]
    LocalIo {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn not_found(
        device: impl Into<String>,
        artifact: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        FetchError::NotFound {
            device: device.into(),
            artifact: artifact.into(),
            detail: detail.into(),
        }
    }

    pub fn upstream(url: impl Into<String>, detail: impl Into<String>) -> Self {
        FetchError::Upstream {
            url: url.into(),
            detail: detail.into(),
            source: None,
        }
    }

    pub fn local_io(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        FetchError::LocalIo {
            path: path.into(),
            operation,
            source,
        }
    }

    /// The selector falls back to a boot image only on this branch.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Create,
    Write,
    Rename,
    Delete,
    CreateDir,
    Metadata,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Rename => write!(f, "renaming"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::CreateDir => write!(f, "creating directory"),
            FileOperation::Metadata => write!(f, "reading metadata"),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

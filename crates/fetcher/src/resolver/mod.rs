//! Build resolution
//!
//! Locates a downloadable artifact for a device codename across three
//! independent backends: the primary nightly index, the mirror network
//! (probed heuristically by build date), and the community archive catalog.

pub mod archive;
pub mod mirror;
pub mod nightly;
pub mod probe;
pub mod record;
pub mod release;

pub use archive::{archive_builds, archive_devices, latest_archive_build};
pub use mirror::{
    find_mirror_artifact, latest_boot, latest_recovery, latest_recovery_or_boot, latest_vbmeta,
};
pub use nightly::{latest_nightly, nightly_builds};
pub use record::BuildRecord;
pub use release::{latest_magisk_apk, ReleaseArtifact};

use serde::Serialize;

/// Which backend resolved an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSource {
    Nightly,
    Mirrorbits,
    Archive,
}

impl std::fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactSource::Nightly => write!(f, "nightly"),
            ArtifactSource::Mirrorbits => write!(f, "mirrorbits"),
            ArtifactSource::Archive => write!(f, "archive"),
        }
    }
}

/// A resolved, downloadable artifact. Only constructed after the backend
/// either listed the URL itself (nightly) or a HEAD probe accepted it.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactDescriptor {
    pub url: String,
    pub filename: String,
    pub source: ArtifactSource,
    /// `YYYYMMDD` build date, when one could be derived.
    pub date: Option<String>,
}

impl ArtifactDescriptor {
    /// Suggested local filename: `{device}-{date}-{filename}` when a build
    /// date is known, else the remote filename as-is.
    pub fn default_save_name(&self, device: &str) -> String {
        match &self.date {
            Some(date) => format!("{}-{}-{}", device, date, self.filename),
            None => self.filename.clone(),
        }
    }
}

//! Mirror artifact prober and the recovery-vs-boot selection policy
//!
//! The mirror network is not indexed by any API. Artifacts are located by
//! guessing: take the dates of the most recent nightly builds, build the
//! fixed-template URL for each, and accept the first one a HEAD probe
//! validates.

use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::http::HttpClient;

use super::nightly::nightly_builds;
use super::probe::{below_client_error, first_accepted, ProbeOutcome};
use super::record;
use super::{ArtifactDescriptor, ArtifactSource};

/// How many recent build dates to probe before giving up.
pub const DEFAULT_MIRROR_TRIES: usize = 12;

/// Locates `artifact` (e.g. `recovery.img`) on the mirror network for a
/// device, probing the dates of its most recent nightly builds newest first.
/// Builds whose filename carries no `-YYYYMMDD-` token are skipped and do
/// not count against `max_tries`.
pub async fn find_mirror_artifact(
    config: &FetchConfig,
    device: &str,
    artifact: &str,
    max_tries: usize,
) -> Result<ArtifactDescriptor> {
    let builds = nightly_builds(config, device).await?;

    let mut candidates: Vec<(String, String)> = Vec::new();
    for build in &builds {
        if candidates.len() >= max_tries {
            break;
        }
        let Some(date) = build.filename().and_then(record::date_token) else {
            continue;
        };
        candidates.push((config.mirror_artifact_url(device, &date, artifact), date));
    }

    debug!(
        "probing {} mirror candidates for {}/{}",
        candidates.len(),
        device,
        artifact
    );

    let client = HttpClient::with_timeout(config, config.probe_timeout)?;
    let urls: Vec<String> = candidates.iter().map(|(url, _)| url.clone()).collect();
    let tried = candidates.len();

    match first_accepted(&client, urls, below_client_error).await {
        ProbeOutcome::Accepted(url) => {
            let date = candidates
                .into_iter()
                .find(|(candidate, _)| *candidate == url)
                .map(|(_, date)| date);
            Ok(ArtifactDescriptor {
                url,
                filename: artifact.to_string(),
                source: ArtifactSource::Mirrorbits,
                date,
            })
        }
        ProbeOutcome::Exhausted(last_failure) => Err(FetchError::not_found(
            device,
            artifact,
            last_failure
                .unwrap_or_else(|| format!("no reachable build among the {tried} most recent dates")),
        )),
    }
}

pub async fn latest_recovery(config: &FetchConfig, device: &str) -> Result<ArtifactDescriptor> {
    find_mirror_artifact(config, device, "recovery.img", DEFAULT_MIRROR_TRIES).await
}

pub async fn latest_boot(config: &FetchConfig, device: &str) -> Result<ArtifactDescriptor> {
    find_mirror_artifact(config, device, "boot.img", DEFAULT_MIRROR_TRIES).await
}

pub async fn latest_vbmeta(config: &FetchConfig, device: &str) -> Result<ArtifactDescriptor> {
    find_mirror_artifact(config, device, "vbmeta.img", DEFAULT_MIRROR_TRIES).await
}

/// Picks the flashable image for a device. Boot-image-only devices go
/// straight to `boot.img`; everyone else tries `recovery.img` first and
/// falls back to `boot.img` only when the recovery image does not exist.
/// Transport failures are never masked by the fallback.
pub async fn latest_recovery_or_boot(
    config: &FetchConfig,
    device: &str,
    boot_image_only: bool,
    max_tries: usize,
) -> Result<ArtifactDescriptor> {
    if boot_image_only {
        return find_mirror_artifact(config, device, "boot.img", max_tries).await;
    }

    match find_mirror_artifact(config, device, "recovery.img", max_tries).await {
        Err(e) if e.is_not_found() => {
            debug!("no recovery image for {device}, falling back to boot image");
            find_mirror_artifact(config, device, "boot.img", max_tries).await
        }
        other => other,
    }
}

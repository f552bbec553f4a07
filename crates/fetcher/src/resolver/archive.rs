//! Archive build locator
//!
//! The community archive catalog is loosely structured: one catalog fetch
//! covers every device, records are inconsistently keyed, and the listed
//! filenames may live on any of several file hosts. Builds are ranked with
//! the composite fallback key from [`record::archive_sort_key`] and the top
//! candidates are validated host by host.

use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::http::HttpClient;

use super::probe::{below_client_error, first_accepted, ProbeOutcome};
use super::record::{self, BuildRecord};
use super::{ArtifactDescriptor, ArtifactSource};

/// How many top-ranked builds to probe before giving up.
pub const DEFAULT_ARCHIVE_TRIES: usize = 3;

/// Fetches the full archive catalog. The endpoint answers either a bare
/// list or an object wrapping it in a `builds` field; non-object entries
/// are discarded.
pub async fn archive_builds(config: &FetchConfig) -> Result<Vec<BuildRecord>> {
    let url = config.archive_builds_url();
    let client = HttpClient::with_timeout(config, config.archive_timeout)?;

    debug!("fetching archive catalog: {url}");
    let response = client.get(&url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::upstream(&url, format!("HTTP {status}")));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| FetchError::upstream(&url, format!("invalid JSON body: {e}")))?;

    // Either a bare list or an object wrapping it under "builds".
    let list = match body {
        serde_json::Value::Object(mut map) => match map.remove("builds") {
            Some(wrapped) => wrapped,
            None => serde_json::Value::Object(map),
        },
        other => other,
    };

    let serde_json::Value::Array(entries) = list else {
        return Err(FetchError::upstream(&url, "unexpected archive API response shape"));
    };

    Ok(entries.into_iter().filter_map(BuildRecord::from_value).collect())
}

/// Sorted, de-duplicated device codenames present in the archive catalog.
pub async fn archive_devices(config: &FetchConfig) -> Result<Vec<String>> {
    let builds = archive_builds(config).await?;
    let mut devices: Vec<String> = builds
        .iter()
        .filter_map(BuildRecord::device)
        .map(str::to_string)
        .collect();
    devices.sort();
    devices.dedup();
    Ok(devices)
}

/// The best downloadable archive build for a device: filter the catalog to
/// exact codename matches, rank with the composite key, and probe candidate
/// URLs for the top `max_tries` records until one validates.
pub async fn latest_archive_build(
    config: &FetchConfig,
    device: &str,
    max_tries: usize,
) -> Result<ArtifactDescriptor> {
    let device = device.trim();
    if device.is_empty() {
        return Err(FetchError::not_found(device, "archive build", "missing device"));
    }

    let mut builds: Vec<BuildRecord> = archive_builds(config)
        .await?
        .into_iter()
        .filter(|b| b.device() == Some(device))
        .collect();

    if builds.is_empty() {
        return Err(FetchError::not_found(device, "archive build", "no catalog entry"));
    }

    builds.sort_by(|a, b| record::archive_sort_key(b).cmp(&record::archive_sort_key(a)));

    let client = HttpClient::with_timeout(config, config.probe_timeout)?;
    let mut last_failure: Option<String> = None;

    for build in builds.iter().take(max_tries.max(1)) {
        let Some(filename) = build.filename() else {
            continue;
        };

        let candidates = candidate_urls(config, filename, build.id());
        match first_accepted(&client, candidates, below_client_error).await {
            ProbeOutcome::Accepted(url) => {
                return Ok(ArtifactDescriptor {
                    url,
                    filename: filename.to_string(),
                    source: ArtifactSource::Archive,
                    date: record::date_token(filename),
                });
            }
            ProbeOutcome::Exhausted(failure) => {
                if failure.is_some() {
                    last_failure = failure;
                }
            }
        }
    }

    Err(FetchError::upstream(
        config.archive_builds_url(),
        last_failure.unwrap_or_else(|| "could not locate a downloadable archive URL".to_string()),
    ))
}

/// One URL per known file host, plus the canonical download-by-id endpoint
/// when the record carries an id.
fn candidate_urls(config: &FetchConfig, filename: &str, id: Option<i64>) -> Vec<String> {
    let filename = filename.trim_start_matches('/');
    let mut urls: Vec<String> = config
        .archive_file_bases
        .iter()
        .map(|base| format!("{base}/{filename}"))
        .collect();
    if let Some(id) = id {
        urls.push(config.archive_download_by_id_url(id));
    }
    urls
}

//! Nightly build locator
//!
//! Queries the primary build-index API for a device and returns all known
//! nightly builds, newest first. The API is trusted directly; no secondary
//! existence probe is issued for URLs it reports.

use serde_json::Value;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::http::HttpClient;

use super::record::{self, BuildRecord};
use super::{ArtifactDescriptor, ArtifactSource};

/// All nightly builds known for a device, sorted by build timestamp
/// descending.
pub async fn nightly_builds(config: &FetchConfig, device: &str) -> Result<Vec<BuildRecord>> {
    let url = config.nightly_index_url(device);
    let client = HttpClient::with_timeout(config, config.nightly_timeout)?;

    debug!("fetching nightly index: {url}");
    let response = client.get(&url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::upstream(&url, format!("HTTP {status}")));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| FetchError::upstream(&url, format!("invalid JSON body: {e}")))?;

    let mut builds: Vec<BuildRecord> = body
        .get("response")
        .and_then(Value::as_array)
        .map(|list| list.iter().cloned().filter_map(BuildRecord::from_value).collect())
        .unwrap_or_default();

    if builds.is_empty() {
        return Err(FetchError::not_found(device, "nightly build", "empty build list"));
    }

    builds.sort_by_key(|b| std::cmp::Reverse(b.integer("datetime").unwrap_or(0)));
    Ok(builds)
}

/// The newest nightly build that carries both a download URL and a filename;
/// records missing either are skipped.
pub async fn latest_nightly(config: &FetchConfig, device: &str) -> Result<ArtifactDescriptor> {
    for build in nightly_builds(config, device).await? {
        let (Some(url), Some(filename)) = (build.url(), build.filename()) else {
            continue;
        };
        return Ok(ArtifactDescriptor {
            url: url.to_string(),
            filename: filename.to_string(),
            source: ArtifactSource::Nightly,
            date: record::date_token(filename),
        });
    }
    Err(FetchError::not_found(
        device,
        "nightly build",
        "no build carries a download url",
    ))
}

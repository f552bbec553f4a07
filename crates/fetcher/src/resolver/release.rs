//! Release locator for the Magisk APK
//!
//! Unlike the build catalogs, the GitHub releases API has a stable, trusted
//! shape, so the response is deserialized into typed structs directly.

use serde::Deserialize;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::http::HttpClient;

/// The latest Magisk release, resolved to a downloadable APK asset.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReleaseArtifact {
    pub tag: String,
    pub filename: String,
    pub url: String,
    pub release_page: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: Option<String>,
    browser_download_url: Option<String>,
}

impl Asset {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn is_apk(&self) -> bool {
        self.name().to_lowercase().ends_with(".apk")
    }
}

/// Latest Magisk APK via the releases API. Prefers the canonically named
/// `Magisk-*.apk` asset, falls back to any APK.
pub async fn latest_magisk_apk(config: &FetchConfig) -> Result<ReleaseArtifact> {
    let url = config.magisk_release_url();
    let client = HttpClient::with_timeout(config, config.nightly_timeout)?;

    debug!("fetching latest Magisk release: {url}");
    let response = client.get(&url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::upstream(&url, format!("HTTP {status}")));
    }

    let release: Release = response
        .json()
        .await
        .map_err(|e| FetchError::upstream(&url, format!("invalid JSON body: {e}")))?;

    let tag = release
        .tag_name
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FetchError::not_found("magisk", "release", "missing tag_name"))?
        .to_string();

    let apk = release
        .assets
        .iter()
        .find(|a| a.name().starts_with("Magisk-") && a.is_apk())
        .or_else(|| release.assets.iter().find(|a| a.is_apk()))
        .ok_or_else(|| FetchError::not_found("magisk", "release", "no APK asset"))?;

    let download_url = apk
        .browser_download_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| FetchError::not_found("magisk", "release", "asset has no download url"))?;
    let filename = apk
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| FetchError::not_found("magisk", "release", "asset has no filename"))?;

    Ok(ReleaseArtifact {
        release_page: format!("https://github.com/topjohnwu/Magisk/releases/tag/{tag}"),
        tag,
        filename: filename.to_string(),
        url: download_url.to_string(),
    })
}

//! Configuration for resolution and download operations

use std::time::Duration;

/// Settings shared by every resolver and by the streaming downloader.
///
/// Defaults carry the production endpoints and timing constants. Tests
/// override the base URLs to point the locators at local mock servers and
/// shrink the retry delays.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Primary nightly build-index API base.
    pub nightly_api_base: String,
    /// Mirror network base for per-date artifact probing.
    pub mirror_base: String,
    /// Archive catalog base (API and download-by-id endpoint).
    pub archive_base: String,
    /// File-hosting bases tried, in order, for archive filenames.
    pub archive_file_bases: Vec<String>,
    /// GitHub API base for release lookups.
    pub releases_api_base: String,
    /// Identifying header attached to every request.
    pub user_agent: String,
    /// Timeout for lightweight existence probes (HEAD).
    pub probe_timeout: Duration,
    /// Timeout for nightly index fetches.
    pub nightly_timeout: Duration,
    /// Timeout for the (larger) archive catalog fetch.
    pub archive_timeout: Duration,
    /// Per-read timeout while streaming a download body.
    pub download_read_timeout: Duration,
    /// Write/progress granularity of the streaming downloader.
    pub chunk_size: usize,
    /// Total attempts (first try included) for idempotent requests.
    pub max_attempts: usize,
    /// Initial delay between retries (doubles each retry).
    pub retry_delay: Duration,
    /// Cap on the exponential backoff delay.
    pub max_retry_delay: Duration,
}

impl FetchConfig {
    pub fn nightly_index_url(&self, device: &str) -> String {
        format!("{}/{}/nightly/0", self.nightly_api_base, device)
    }

    pub fn mirror_artifact_url(&self, device: &str, date: &str, artifact: &str) -> String {
        format!("{}/{}/{}/{}", self.mirror_base, device, date, artifact)
    }

    pub fn archive_builds_url(&self) -> String {
        format!("{}/api/builds", self.archive_base)
    }

    pub fn archive_download_by_id_url(&self, id: i64) -> String {
        format!("{}/build/{}/download", self.archive_base, id)
    }

    pub fn magisk_release_url(&self) -> String {
        format!(
            "{}/repos/topjohnwu/Magisk/releases/latest",
            self.releases_api_base
        )
    }

    /// Calculate retry delay for the given attempt using exponential backoff
    pub fn get_retry_delay(&self, attempt: usize) -> Duration {
        let delay = self.retry_delay.as_millis() as u64 * 2_u64.pow(attempt as u32);
        Duration::from_millis(delay.min(self.max_retry_delay.as_millis() as u64))
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            nightly_api_base: "https://download.lineageos.org/api/v1".to_string(),
            mirror_base: "https://mirrorbits.lineageos.org/full".to_string(),
            archive_base: "https://lineage-archive.timschumi.net".to_string(),
            archive_file_bases: vec![
                "https://b4.timschumi.net/lineage-archive".to_string(),
                "https://lineage-archive.timschumi.net".to_string(),
            ],
            releases_api_base: "https://api.github.com".to_string(),
            user_agent: "LineageOS Downloader FOSS".to_string(),
            probe_timeout: Duration::from_secs(20),
            nightly_timeout: Duration::from_secs(30),
            archive_timeout: Duration::from_secs(60),
            download_read_timeout: Duration::from_secs(120),
            chunk_size: 1024 * 1024,
            max_attempts: 6,
            retry_delay: Duration::from_millis(600),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

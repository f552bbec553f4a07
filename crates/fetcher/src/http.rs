//! HTTP client factory
//!
//! Every resolver and the downloader obtain their own scoped client here.
//! The factory attaches the identifying `User-Agent` and retries idempotent
//! requests (`GET`, `HEAD`) on connection failures and on transient status
//! codes with exponential backoff. A response whose status is still in the
//! retryable set after the last attempt is handed to the caller as-is, never
//! converted to an error by the factory itself.

use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};

/// Statuses worth retrying before the final response reaches the caller.
const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

pub struct HttpClient {
    client: Client,
    config: FetchConfig,
}

impl HttpClient {
    /// Client for metadata fetches and existence probes, with a
    /// whole-request timeout.
    pub fn with_timeout(config: &FetchConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                FetchError::upstream("<client setup>", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Client for download bodies: a per-read timeout instead of a
    /// whole-transfer deadline, so multi-gigabyte files are not cut off.
    pub fn for_streaming(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .read_timeout(config.download_read_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                FetchError::upstream("<client setup>", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send_with_retry(Method::GET, url).await
    }

    pub async fn head(&self, url: &str) -> Result<Response> {
        self.send_with_retry(Method::HEAD, url).await
    }

    async fn send_with_retry(&self, method: Method, url: &str) -> Result<Response> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<reqwest::Error> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.config.get_retry_delay(attempt - 1);
                debug!("retry {}/{} for {} {} after {:?}", attempt, attempts - 1, method, url, delay);
                tokio::time::sleep(delay).await;
            }

            match self.client.request(method.clone(), url).send().await {
                Ok(response) => {
                    if RETRYABLE_STATUSES.contains(&response.status()) && attempt + 1 < attempts {
                        warn!("{} {} returned {}, retrying", method, url, response.status());
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if (e.is_connect() || e.is_timeout()) && attempt + 1 < attempts {
                        warn!("{} {} failed: {}, retrying", method, url, e);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(FetchError::Upstream {
                        url: url.to_string(),
                        detail: e.to_string(),
                        source: Some(e),
                    });
                }
            }
        }

        let detail = last_error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "all retry attempts failed".to_string());
        Err(FetchError::Upstream {
            url: url.to_string(),
            detail,
            source: last_error,
        })
    }
}

//! Shared probe-candidates-in-order loop
//!
//! Both the mirror prober and the archive locator validate heuristically
//! built URLs the same way: HEAD each candidate in order, accept the first
//! one the predicate approves, and remember the last failure for the
//! caller's error message. Transport errors on an individual probe are
//! recorded and swallowed so the next candidate still gets its turn.

use reqwest::StatusCode;
use tracing::debug;

use crate::http::HttpClient;

/// Result of walking a candidate list.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// First URL the predicate accepted.
    Accepted(String),
    /// All candidates failed; carries the last observed status or error.
    Exhausted(Option<String>),
}

/// Default acceptance rule: any status below the client-error range.
pub fn below_client_error(status: StatusCode) -> bool {
    status.as_u16() < 400
}

pub async fn first_accepted<I, P>(client: &HttpClient, candidates: I, accept: P) -> ProbeOutcome
where
    I: IntoIterator<Item = String>,
    P: Fn(StatusCode) -> bool,
{
    let mut last_failure = None;

    for url in candidates {
        match client.head(&url).await {
            Ok(response) if accept(response.status()) => {
                debug!("probe accepted {} ({})", url, response.status());
                return ProbeOutcome::Accepted(url);
            }
            Ok(response) => {
                debug!("probe rejected {} ({})", url, response.status());
                last_failure = Some(format!("HTTP {} for {}", response.status().as_u16(), url));
            }
            Err(e) => {
                debug!("probe failed for {}: {}", url, e);
                last_failure = Some(e.to_string());
            }
        }
    }

    ProbeOutcome::Exhausted(last_failure)
}

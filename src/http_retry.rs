//! Segment fetch with bounded retry and linear backoff.
//!
//! Origins occasionally drop or block individual segment fetches on a live
//! stream even when the playlist is healthy, so the relay tries each segment
//! up to [`DEFAULT_MAX_ATTEMPTS`] times. 401/403 answers count as failed
//! attempts: the block is usually transient (rotating edge nodes), and a
//! well-formed response is not the same as a usable one.

use crate::error::{ProxyError, Result};
use reqwest::{Client, Response, header};
use std::time::Duration;
use tracing::warn;

/// Total fetch attempts per segment (1 initial + 2 retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base backoff in milliseconds; attempt N sleeps `N × base` before N+1.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 300;

/// Configuration for [`fetch_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts (minimum 1; 0 is treated as 1).
    pub max_attempts: u32,
    /// Linear backoff base; the sleep after attempt N is `N × backoff_base`.
    pub backoff_base: Duration,
    /// Per-attempt timeout. When `None`, the client's own timeout applies.
    pub timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            timeout: None,
        }
    }
}

/// Classify one upstream answer as success or a per-attempt error.
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ProxyError::UpstreamBlocked(status));
    }
    if !status.is_success() {
        return Err(ProxyError::UpstreamStatus(status));
    }
    Ok(response)
}

async fn attempt(
    client: &Client,
    url: &str,
    range: Option<&str>,
    config: &RetryConfig,
) -> Result<Response> {
    let mut request = client.get(url);
    if let Some(timeout) = config.timeout {
        request = request.timeout(timeout);
    }
    if let Some(range) = range {
        request = request.header(header::RANGE, range);
    }

    check_status(request.send().await?)
}

/// Fetch a segment URL, forwarding the inbound Range header, with retry.
///
/// Attempts up to `config.max_attempts` fetches, sleeping
/// `attempt × config.backoff_base` between consecutive attempts (none after
/// the last). A 401/403 answer is an attempt failure like any transport
/// error; a 2xx answer (206 included) is returned as-is for streaming.
///
/// # Errors
///
/// The last per-attempt error once all attempts are exhausted.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    range: Option<&str>,
    config: &RetryConfig,
) -> Result<Response> {
    let max_attempts = config.max_attempts.max(1);

    // Attempts 1..N-1 with backoff between each; the final attempt returns
    // directly below so no panic path is needed to satisfy the compiler.
    for n in 1..max_attempts {
        match attempt(client, url, range, config).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                warn!(
                    "Segment fetch attempt {}/{} failed for {}: {}",
                    n, max_attempts, url, e
                );
            }
        }

        let backoff = config.backoff_base * n;
        warn!("Retrying segment fetch in {}ms...", backoff.as_millis());
        tokio::time::sleep(backoff).await;
    }

    attempt(client, url, range, config).await.map_err(|e| {
        warn!(
            "Segment fetch attempt {}/{} failed for {}: {}",
            max_attempts, max_attempts, url, e
        );
        e
    })
}

/// Suffix-based content-type guess for when upstream omits the header.
pub fn guess_content_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let suffix = path.rsplit('.').next().map(|s| s.to_ascii_lowercase());

    match suffix.as_deref() {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

//! Outbound HTTP client with a fixed browser identity.
//!
//! The origin's live pages and manifest URLs are IP/UA-sensitive, so every
//! outbound fetch carries the same synthetic browser headers. Playlist and
//! page fetches are single-shot; the segment relay layers its own retry on
//! top in [`crate::http_retry`].

use crate::error::{ProxyError, Result};
use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderValue},
};
use std::time::Duration;
use tracing::info;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36";

/// Build the shared outbound client.
///
/// Accept-Encoding is not set here: reqwest's gzip/deflate/brotli features
/// send it and transparently decode response bodies.
pub fn build_client(default_timeout: Duration) -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(default_timeout)
        .build()
        .expect("failed to build HTTP client")
}

/// Fetch a text resource (origin page or playlist) in a single attempt.
///
/// # Errors
///
/// [`ProxyError::UpstreamStatus`] on a non-2xx answer,
/// [`ProxyError::UpstreamFetch`] on transport failure or timeout.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    info!("Fetching: {}", url);

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProxyError::UpstreamStatus(status));
    }

    Ok(response.text().await?)
}

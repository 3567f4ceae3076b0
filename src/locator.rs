//! Live manifest discovery.
//!
//! The origin does not publish the live HLS manifest URL as a stable
//! endpoint; it has to be dug out of a channel/watch/embed page. Discovery
//! walks a fixed priority list of page shapes, fetching each one and running
//! an ordered set of extraction patterns over the body. The first candidate
//! that fetches and yields a usable URL wins; everything after it is skipped.

use crate::{
    config::Config,
    error::{ProxyError, Result},
    upstream,
};
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use tracing::{info, warn};

/// `"hlsManifestUrl":"..."` with the quotes tight against the value.
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"hlsManifestUrl":"([^"]+\.m3u8)"#).unwrap());

/// Same field, tolerant of whitespace around the colon.
static LABELED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""hlsManifestUrl"\s*:\s*"([^"]+\.m3u8)""#).unwrap());

/// Any bare `.m3u8` URL in the page.
static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^"']+\.m3u8[^"']*"#).unwrap());

/// Fallback `"url":"...m3u8..."` field.
static URL_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""url"\s*:\s*"([^"]+\.m3u8[^"]*)""#).unwrap());

/// A small `streamingData` object; parsed as JSON and the manifest field read
/// from it.
static STREAMING_DATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""streamingData"\s*:\s*(\{[^}]+\})"#).unwrap());

fn extract_marker(page: &str) -> Option<String> {
    MARKER_RE
        .captures(page)
        .map(|c| c[1].to_string())
}

fn extract_labeled(page: &str) -> Option<String> {
    LABELED_RE
        .captures(page)
        .map(|c| c[1].to_string())
}

fn extract_bare_url(page: &str) -> Option<String> {
    BARE_URL_RE.find(page).map(|m| m.as_str().to_string())
}

fn extract_url_field(page: &str) -> Option<String> {
    URL_FIELD_RE
        .captures(page)
        .map(|c| c[1].to_string())
}

fn extract_streaming_data(page: &str) -> Option<String> {
    let object = STREAMING_DATA_RE.captures(page)?;
    let value: serde_json::Value = serde_json::from_str(&object[1]).ok()?;
    value
        .get("hlsManifestUrl")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Extraction strategies in priority order; the first hit wins per page.
const EXTRACTORS: &[fn(&str) -> Option<String>] = &[
    extract_marker,
    extract_labeled,
    extract_bare_url,
    extract_url_field,
    extract_streaming_data,
];

/// Undo the escaping the page applies to embedded URLs, then percent-decode.
///
/// Returns `None` when the decoded value is not an absolute HTTP(S) URL.
fn normalize(raw: &str) -> Option<String> {
    let unescaped = raw.replace("\\u0026", "&").replace("&amp;", "&");
    let decoded = urlencoding::decode(&unescaped).ok()?.into_owned();

    if decoded.starts_with("http") {
        Some(decoded)
    } else {
        None
    }
}

/// Run the extraction patterns over a fetched page body.
fn extract_manifest_url(page: &str) -> Option<String> {
    for extractor in EXTRACTORS {
        if let Some(raw) = extractor(page) {
            // Pattern priority is absolute: a match that fails to
            // normalize fails the whole page, it does not fall through
            // to later patterns.
            return normalize(&raw);
        }
    }
    None
}

/// Build the ordered candidate page list for a channel handle or video id.
///
/// Some shapes cannot match some reference kinds (a handle probed against a
/// watch URL never extracts anything); the full list is kept anyway because
/// the origin's page structure is undocumented and probes are cheap.
pub fn candidate_pages(channel: &str, config: &Config) -> Vec<String> {
    let primary = config.page_origin.trim_end_matches('/');
    let mobile = config.mobile_origin.trim_end_matches('/');

    let mut pages = vec![
        format!("{primary}/{channel}/live"),
        format!("{primary}/channel/{channel}/live"),
        format!("{primary}/watch?v={channel}"),
        format!("{primary}/embed/{channel}"),
        format!("{mobile}/watch?v={channel}"),
    ];

    for origin in &config.fallback_origins {
        if channel.starts_with('@') {
            pages.push(format!("{origin}/{channel}/live"));
        } else {
            pages.push(format!("{origin}/watch?v={channel}"));
        }
    }

    pages
}

/// Resolve the live master-playlist URL for a channel handle or video id.
///
/// Candidates are probed strictly in order, one fetch attempt each; a
/// transport failure, non-2xx answer, or page without a usable manifest URL
/// just moves on to the next candidate.
///
/// # Errors
///
/// [`ProxyError::ManifestNotFound`] carrying the most recent per-candidate
/// error once the whole list is exhausted.
pub async fn locate(client: &Client, channel: &str, config: &Config) -> Result<String> {
    let mut last_error = "no candidate pages tried".to_string();

    for page in candidate_pages(channel, config) {
        match probe_page(client, &page).await {
            Ok(Some(url)) => {
                info!("Found manifest URL: {}", url);
                return Ok(url);
            }
            Ok(None) => {
                warn!("No manifest URL in page: {}", page);
                last_error = format!("no live manifest URL in page {page}");
            }
            Err(e) => {
                warn!("Candidate {} failed: {}", page, e);
                last_error = e.to_string();
            }
        }
    }

    Err(ProxyError::ManifestNotFound(last_error))
}

async fn probe_page(client: &Client, page: &str) -> Result<Option<String>> {
    let body = upstream::fetch_text(client, page).await?;
    Ok(extract_manifest_url(&body))
}

//! Segment relay: fetch one media segment and stream it through.
//!
//! The upstream status is preserved so 206 partial-content semantics work
//! under Range requests; the body is streamed, never buffered whole.

use crate::{
    error::{ProxyError, Result},
    http_retry::{RetryConfig, fetch_with_retry, guess_content_type},
    metrics,
    server::{NO_STORE, state::AppState, url_validation::validate_target_url},
};
use axum::{body::Body, http::header, response::Response};
use std::time::Duration;
use tracing::info;

pub async fn serve_segment(
    state: &AppState,
    target: &str,
    range: Option<&str>,
) -> Result<Response> {
    validate_target_url(target, state.config.allow_private_targets)?;
    info!("Relaying segment: {}", target);

    let retry = RetryConfig {
        timeout: Some(Duration::from_secs(state.config.segment_timeout_secs)),
        ..Default::default()
    };

    let upstream = match fetch_with_retry(&state.http_client, target, range, &retry).await {
        Ok(response) => response,
        Err(e) => {
            metrics::record_origin_error();
            return Err(e);
        }
    };

    let status = upstream.status();
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_else(|| guess_content_type(target))
        .to_string();
    let content_length = upstream.headers().get(header::CONTENT_LENGTH).cloned();
    let content_range = upstream.headers().get(header::CONTENT_RANGE).cloned();
    let accept_ranges = upstream
        .headers()
        .get(header::ACCEPT_RANGES)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("bytes"));

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, accept_ranges)
        .header(header::CACHE_CONTROL, NO_STORE)
        .header(header::VARY, "Origin");
    if let Some(length) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }
    if let Some(range) = content_range {
        builder = builder.header(header::CONTENT_RANGE, range);
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ProxyError::Internal(format!("failed to build segment response: {e}")))
}

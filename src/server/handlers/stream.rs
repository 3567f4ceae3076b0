//! Proxy entry point: one route, three modes.
//!
//! `GET /{channel}/{file}.m3u8` resolves and rewrites the master playlist;
//! `?variant=<url>` rewrites one variant playlist; `?url=<url>` relays one
//! media segment. `url` is checked before `variant`, so exactly one mode
//! runs per request even when both parameters are present.

use crate::{
    error::{ProxyError, Result},
    metrics,
    server::{
        handlers::{playlist, segment},
        state::AppState,
    },
};
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, header},
    response::Response,
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

pub async fn serve(
    Path((channel, file)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();

    if channel.is_empty() {
        return Err(ProxyError::BadRequest(
            "Usage: /@handle/stream.m3u8".to_string(),
        ));
    }
    if !file.ends_with(".m3u8") {
        return Err(ProxyError::BadRequest(
            "Only .m3u8 playlists are served here".to_string(),
        ));
    }

    // Rewritten links must point back at this same path. The raw request
    // path is reused so percent-encoded segments stay encoded; the decoded
    // `channel`/`file` params are only inspected, never re-joined.
    let proxy_base = format!(
        "{}{}",
        state.config.base_url.trim_end_matches('/'),
        uri.path()
    );
    let debug = params.get("debug").is_some_and(|v| !v.is_empty());

    let (endpoint, result) = if let Some(target) = params.get("url") {
        let range = headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok());
        ("segment", segment::serve_segment(&state, target, range).await)
    } else if let Some(variant_url) = params.get("variant") {
        (
            "variant",
            playlist::serve_variant(&state, variant_url, &proxy_base, debug).await,
        )
    } else {
        info!("Resolving master playlist for: {}", channel);
        (
            "master",
            playlist::serve_master(&state, &channel, &proxy_base, debug).await,
        )
    };

    let status = match &result {
        Ok(response) => response.status().as_u16(),
        Err(e) => e.status_code().as_u16(),
    };
    metrics::record_request(endpoint, status);
    metrics::record_duration(endpoint, start);

    result
}

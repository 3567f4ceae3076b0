//! Master and variant playlist modes.
//!
//! Both fetch the playlist fresh (nothing is cached across requests),
//! rewrite it, and answer with the HLS content type. `?debug=` swaps the
//! body for a plain-text dump of what was fetched and produced.

use crate::{
    error::Result,
    locator, rewrite,
    rewrite::Rewritten,
    server::{NO_STORE, state::AppState, url_validation::validate_target_url},
    upstream,
};
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::info;

/// Resolve the channel's live manifest, fetch it, and rewrite every
/// absolute URL into a `?variant=` proxy link.
pub async fn serve_master(
    state: &AppState,
    channel: &str,
    proxy_base: &str,
    debug: bool,
) -> Result<Response> {
    let manifest_url = locator::locate(&state.http_client, channel, &state.config).await?;
    let master = upstream::fetch_text(&state.http_client, &manifest_url).await?;
    let rewritten = rewrite::rewrite_master(&master, proxy_base);

    if rewritten.encrypted {
        info!("Master playlist for {} carries a key directive", channel);
    }

    if debug {
        return Ok(debug_dump("source_manifest", &manifest_url, &master, &rewritten));
    }
    Ok(playlist_response(rewritten.text))
}

/// Fetch one variant playlist and rewrite its segment references into
/// `?url=` proxy links resolved against the variant's own URL.
pub async fn serve_variant(
    state: &AppState,
    variant_url: &str,
    proxy_base: &str,
    debug: bool,
) -> Result<Response> {
    validate_target_url(variant_url, state.config.allow_private_targets)?;
    info!("Proxying variant playlist: {}", variant_url);

    let text = upstream::fetch_text(&state.http_client, variant_url).await?;
    let rewritten = rewrite::rewrite_variant(&text, variant_url, proxy_base);

    if debug {
        return Ok(debug_dump("variant_source", variant_url, &text, &rewritten));
    }
    Ok(playlist_response(rewritten.text))
}

fn playlist_response(text: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/vnd.apple.mpegurl"),
            (header::CACHE_CONTROL, NO_STORE),
        ],
        text,
    )
        .into_response()
}

/// Plain-text diagnostic dump in place of the playlist body.
fn debug_dump(label: &str, source: &str, original: &str, rewritten: &Rewritten) -> Response {
    let body = format!(
        "# tubecast debug\n# {label}: {source}\n# encrypted: {}\n\n{original}\n\n--- rewritten ---\n\n{}",
        rewritten.encrypted, rewritten.text
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, NO_STORE),
        ],
        body,
    )
        .into_response()
}

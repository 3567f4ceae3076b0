//! Playlist rewriting.
//!
//! Master and variant playlists are rewritten as text, not parsed as HLS:
//! the proxy only needs to redirect references back through itself, and a
//! structural parse would have to round-trip every tag the origin emits.
//! Comment lines (`#...`) are preserved byte-for-byte; only reference
//! content changes.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

/// Absolute HTTP(S) URL occurrences inside master playlists. Not anchored to
/// line starts — stream-info attribute lists can carry several URLs per line.
static ABSOLUTE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s,]+").unwrap());

/// `#EXT-X-KEY` anywhere in the playlist, any case.
static KEY_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#EXT-X-KEY").unwrap());

/// A rewritten playlist plus what was learned about it on the way through.
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub text: String,
    /// Playlist carries a key directive; detection only, segments are
    /// relayed as-is either way.
    pub encrypted: bool,
}

/// Returns `true` when the playlist declares encrypted segments.
pub fn is_encrypted(text: &str) -> bool {
    KEY_MARKER_RE.is_match(text)
}

/// Rewrite a master playlist so every absolute URL routes back through the
/// proxy as a variant request.
///
/// All HTTP(S) URLs are rewritten uniformly, whether or not they name a
/// `.m3u8` resource — media-less renditions (audio, subtitles, I-frames)
/// still have to round-trip through the proxy.
pub fn rewrite_master(master: &str, proxy_base: &str) -> Rewritten {
    let text = ABSOLUTE_URL_RE
        .replace_all(master, |caps: &regex::Captures| {
            format!("{proxy_base}?variant={}", urlencoding::encode(&caps[0]))
        })
        .into_owned();

    Rewritten {
        text,
        encrypted: is_encrypted(master),
    }
}

/// Rewrite a variant playlist so every segment reference routes back through
/// the proxy as a segment request.
///
/// Line-oriented: empty and `#` lines pass through untouched; every other
/// line is resolved against the variant's own source URL (relative segment
/// paths are the common case). A line that fails to resolve is passed
/// through unchanged — one malformed reference never aborts the rewrite.
pub fn rewrite_variant(variant: &str, source_url: &str, proxy_base: &str) -> Rewritten {
    let base = Url::parse(source_url).ok();

    let text = variant
        .split('\n')
        .map(|raw| {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.is_empty() || line.starts_with('#') {
                return line.to_string();
            }

            let resolved = match &base {
                Some(base) => base.join(line),
                None => Url::parse(line),
            };

            match resolved {
                Ok(url) => {
                    format!("{proxy_base}?url={}", urlencoding::encode(url.as_str()))
                }
                Err(e) => {
                    warn!("Failed to resolve segment reference '{}': {}", line, e);
                    line.to_string()
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    Rewritten {
        text,
        encrypted: is_encrypted(variant),
    }
}

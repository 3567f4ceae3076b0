//! tubecast — live HLS proxy.
//!
//! Resolves a channel's live master playlist by probing the origin's page
//! shapes, rewrites master/variant playlists so every reference routes back
//! through the proxy, and relays media segments with retry and Range
//! passthrough.

pub mod config;
pub mod error;
pub mod http_retry;
pub mod locator;
pub mod metrics;
pub mod rewrite;
pub mod server;
pub mod upstream;

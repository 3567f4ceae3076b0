use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::server::NO_STORE;

/// Crate-wide error type.
///
/// Every variant maps to exactly one outbound status code; bodies are
/// plain text and never leak more than the upstream status/message.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed client input (path, suffix, `url`/`variant` value).
    #[error("{0}")]
    BadRequest(String),

    /// Manifest discovery exhausted every candidate page.
    ///
    /// Carries the most recent underlying error for diagnostics.
    #[error("could not find a live manifest for this handle or id. Last error: {0}")]
    ManifestNotFound(String),

    /// Transport-level failure talking to the origin (includes timeouts).
    #[error("upstream request failed: {0}")]
    UpstreamFetch(#[from] reqwest::Error),

    /// Origin answered with a non-success status.
    #[error("upstream returned {0}")]
    UpstreamStatus(StatusCode),

    /// Origin rejected the request with 401/403, surfaced after the
    /// relay's retry budget is spent.
    #[error("upstream blocked the request ({0})")]
    UpstreamBlocked(StatusCode),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::ManifestNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::UpstreamFetch(_)
            | ProxyError::UpstreamStatus(_)
            | ProxyError::UpstreamBlocked(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, NO_STORE),
            ],
            self.to_string(),
        )
            .into_response()
    }
}

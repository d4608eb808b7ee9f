//! Error types and their HTTP mapping.

use axum::http::header::{InvalidHeaderName, InvalidHeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response;
use crate::routing::RouteError;

/// Failures while handling a single proxied request.
///
/// Upstream non-2xx responses are not errors; they are passed through.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("bad request: {0}")]
    BadRequest(#[from] RouteError),

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[from] reqwest::Error),

    #[error("upstream unreachable: no response within {0}s")]
    UpstreamTimeout(u64),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("failed to read upstream body: {0}")]
    Body(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamUnreachable(_)
            | ProxyError::UpstreamTimeout(_)
            | ProxyError::InvalidHeader(_)
            | ProxyError::Body(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        response::plain(self.status(), format!("Error:\n{self}"))
    }
}

/// Failures while constructing the server from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid header name in configuration: {0}")]
    HeaderName(#[from] InvalidHeaderName),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid fallback URL: {0}")]
    FallbackUrl(#[from] url::ParseError),
}

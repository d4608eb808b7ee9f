//! Response construction.
//!
//! # Responsibilities
//! - Turn upstream responses into client responses (streamed, sanitized)
//! - Buffer cacheable bodies up to a size limit
//! - Build the fixed empty and plain-text responses
//!
//! # Design Decisions
//! - Uncached upstream bodies are streamed, never buffered
//! - An oversized cache fill turns into a stream without losing the bytes
//!   already read
//! - Every response leaving the proxy carries the CORS header set

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::{stream, StreamExt};

use crate::security::{apply_cors, HeaderSanitizer};

/// Outcome of reading an upstream body for caching.
pub enum Buffered {
    /// The whole body, within the limit.
    Complete(Bytes),
    /// The body exceeded the limit; the bytes read so far followed by the rest
    /// of the upstream stream.
    Oversized(Body),
}

/// Read an upstream body into memory unless it grows past `limit` bytes.
pub async fn buffer_limited(
    upstream: reqwest::Response,
    limit: usize,
) -> Result<Buffered, reqwest::Error> {
    let mut chunks = Box::pin(upstream.bytes_stream());
    let mut buffered = Vec::new();

    while let Some(chunk) = chunks.next().await {
        buffered.extend_from_slice(&chunk?);
        if buffered.len() > limit {
            let prefix = stream::once(async move { Ok::<_, reqwest::Error>(Bytes::from(buffered)) });
            return Ok(Buffered::Oversized(Body::from_stream(prefix.chain(chunks))));
        }
    }

    Ok(Buffered::Complete(Bytes::from(buffered)))
}

/// Stream an upstream response to the client with sanitized headers.
pub fn from_upstream(upstream: reqwest::Response, sanitizer: &HeaderSanitizer) -> Response {
    let status = upstream.status();
    let headers = sanitizer.inbound(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// An empty-bodied response (`OPTIONS`, `generate_204`, `generate_200`).
pub fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    apply_cors(response.headers_mut());
    response
}

/// A plain-text diagnostic response.
pub fn plain(status: StatusCode, message: impl Into<String>) -> Response {
    let mut response = Response::new(Body::from(message.into()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    apply_cors(headers);
    response
}

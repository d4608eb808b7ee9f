//! Conditional (ETag) responses for cached entities.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use crate::cache::entity::CachedEntity;

/// Serve `entity`, or `304 Not Modified` with its headers when the client's
/// `If-None-Match` equals the entity ETag exactly.
pub fn apply_conditional(if_none_match: Option<&HeaderValue>, entity: &CachedEntity) -> Response {
    let not_modified = if_none_match
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == entity.etag);

    let (status, body) = if not_modified {
        (StatusCode::NOT_MODIFIED, Body::empty())
    } else {
        (entity.status, Body::from(entity.body.clone()))
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = entity.headers.clone();
    response
}

//! Cached response entities and their ETags.

use std::time::{Duration, SystemTime};

use axum::body::Bytes;
use axum::http::header::{self, HeaderMap, HeaderValue, InvalidHeaderValue};
use axum::http::StatusCode;
use sha2::{Digest, Sha256};

/// A fully buffered upstream response held by the cache.
///
/// Entities are never mutated once stored; a later write to the same key
/// replaces the whole entity.
#[derive(Debug, Clone)]
pub struct CachedEntity {
    pub body: Bytes,
    pub status: StatusCode,
    /// Sanitized response headers, including `ETag` and `Cache-Control`.
    pub headers: HeaderMap,
    pub etag: String,
    pub stored_at: SystemTime,
    pub ttl_secs: u32,
}

impl CachedEntity {
    /// Build an entity from a sanitized response, stamping `ETag` and
    /// `Cache-Control: public, max-age=<ttl>`.
    pub fn new(
        status: StatusCode,
        mut headers: HeaderMap,
        body: Bytes,
        ttl_secs: u32,
    ) -> Result<Self, InvalidHeaderValue> {
        let etag = etag_for(&body);
        headers.insert(header::ETAG, HeaderValue::from_str(&etag)?);
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_str(&format!("public, max-age={ttl_secs}"))?,
        );

        Ok(Self {
            body,
            status,
            headers,
            etag,
            stored_at: SystemTime::now(),
            ttl_secs,
        })
    }

    pub fn expires_at(&self) -> SystemTime {
        self.stored_at + Duration::from_secs(u64::from(self.ttl_secs))
    }

    /// Whether the entity is still within its TTL at `now`.
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        self.expires_at() > now
    }
}

/// Quoted hex SHA-256 digest of a response body.
pub fn etag_for(body: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(body))
}

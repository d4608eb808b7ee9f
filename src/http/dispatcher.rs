//! Request dispatch.
//!
//! # Responsibilities
//! - Answer `OPTIONS`, `generate_204` and `generate_200` without routing
//! - Route the path into a directive
//! - Serve cache hits, fill the cache on misses, stream everything else
//! - Convert every failure into an HTTP response
//!
//! # Design Decisions
//! - One task per request; the cache store is the only shared state
//! - A cache entity is written only after its whole body is buffered, so a
//!   request dropped on client disconnect never stores a partial body
//! - Cache backend failures degrade to uncached proxying
//! - One deadline (`timeouts.request_secs`) covers routing-to-response-head,
//!   cache fills included; overrunning it is an upstream failure (502)
//! - Bodies larger than `cache.max_entity_bytes` are streamed uncached

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::cache::{apply_conditional, CacheStore, CachedEntity};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, SetupError};
use crate::http::request::request_id;
use crate::http::response::{self, Buffered};
use crate::observability::metrics;
use crate::routing::{Directive, PathRouter, ProxyDirective};
use crate::security::HeaderSanitizer;
use crate::upstream::UpstreamFetcher;

/// Request headers that would make the upstream answer with something other
/// than the full representation.
const CACHE_FILL_STRIPPED: [header::HeaderName; 4] = [
    header::IF_NONE_MATCH,
    header::IF_MODIFIED_SINCE,
    header::RANGE,
    header::IF_RANGE,
];

/// Top-level request orchestration.
pub struct Dispatcher {
    router: PathRouter,
    sanitizer: HeaderSanitizer,
    fetcher: UpstreamFetcher,
    cache: Arc<dyn CacheStore>,
    fallback_url: Option<Url>,
    request_timeout: Duration,
    max_entity_bytes: usize,
}

impl Dispatcher {
    pub fn new(config: &ProxyConfig, cache: Arc<dyn CacheStore>) -> Result<Self, SetupError> {
        let fallback_url = config
            .upstream
            .fallback_url
            .as_deref()
            .map(Url::parse)
            .transpose()?;

        Ok(Self {
            router: PathRouter::new(&config.cache),
            sanitizer: HeaderSanitizer::new(&config.headers)?,
            fetcher: UpstreamFetcher::new(&config.upstream, &config.timeouts)?,
            cache,
            fallback_url,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            max_entity_bytes: config.cache.max_entity_bytes,
        })
    }

    /// Handle one inbound request. Always produces a response.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let request_id = request_id(request.headers()).to_string();
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        if method == Method::OPTIONS || request.uri().path() == "/generate_204" {
            metrics::record_request(method.as_str(), 204, "special", start);
            return response::empty(StatusCode::NO_CONTENT);
        }
        if request.uri().path().starts_with("/generate_200") {
            metrics::record_request(method.as_str(), 200, "special", start);
            return response::empty(StatusCode::OK);
        }

        let (mode, result) = match self.router.route(&path) {
            Ok(Some(directive)) => {
                tracing::debug!(
                    request_id = %request_id,
                    method = %method,
                    target = %directive.target(),
                    mode = directive.mode_label(),
                    ttl_secs = ?directive.ttl_secs(),
                    follow_redirects = directive.proxy().follow_redirects,
                    "Routed request"
                );
                let mode = directive.mode_label();
                (mode, self.within_deadline(self.handle(&request_id, directive, request)).await)
            }
            Ok(None) => ("fallback", self.within_deadline(self.fallback()).await),
            Err(e) => ("bad_request", Err(ProxyError::from(e))),
        };

        let response = result.unwrap_or_else(|e| {
            match &e {
                ProxyError::BadRequest(_) => {
                    tracing::warn!(request_id = %request_id, path = %path, error = %e, "Bad request")
                }
                _ => {
                    metrics::record_upstream_error();
                    tracing::warn!(request_id = %request_id, path = %path, error = %e, "Upstream request failed")
                }
            }
            e.into_response()
        });

        metrics::record_request(method.as_str(), response.status().as_u16(), mode, start);
        response
    }

    async fn within_deadline(
        &self,
        work: impl Future<Output = Result<Response, ProxyError>>,
    ) -> Result<Response, ProxyError> {
        tokio::time::timeout(self.request_timeout, work)
            .await
            .unwrap_or_else(|_| Err(ProxyError::UpstreamTimeout(self.request_timeout.as_secs())))
    }

    async fn handle(
        &self,
        request_id: &str,
        directive: Directive,
        request: Request<Body>,
    ) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();
        let headers = self
            .sanitizer
            .outbound(&parts.headers, &directive.proxy().referer)?;

        match directive.ttl_secs() {
            Some(ttl_secs) if is_cacheable(&parts.method) => {
                self.cached(request_id, &directive, ttl_secs, &parts, headers)
                    .await
            }
            _ => {
                self.passthrough(directive.proxy(), parts.method, headers, body)
                    .await
            }
        }
    }

    async fn passthrough(
        &self,
        proxy: &ProxyDirective,
        method: Method,
        headers: HeaderMap,
        body: Body,
    ) -> Result<Response, ProxyError> {
        let upstream = self
            .fetcher
            .fetch(&proxy.target, method, headers, body, proxy.follow_redirects)
            .await?;
        Ok(response::from_upstream(upstream, &self.sanitizer))
    }

    async fn cached(
        &self,
        request_id: &str,
        directive: &Directive,
        ttl_secs: u32,
        parts: &Parts,
        mut headers: HeaderMap,
    ) -> Result<Response, ProxyError> {
        let key = directive.cache_key();
        let if_none_match = parts.headers.get(header::IF_NONE_MATCH);

        match self.cache.get(&key).await {
            Ok(Some(entity)) => {
                metrics::record_cache_lookup(true);
                tracing::debug!(request_id = %request_id, key = %key, "Cache hit");
                return Ok(apply_conditional(if_none_match, &entity));
            }
            Ok(None) => {
                metrics::record_cache_lookup(false);
                tracing::debug!(request_id = %request_id, key = %key, "Cache miss");
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, key = %key, error = %e, "Cache lookup failed, fetching upstream");
            }
        }

        // A HEAD response has no body to store.
        if parts.method == Method::HEAD {
            return self
                .passthrough(directive.proxy(), Method::HEAD, headers, Body::empty())
                .await;
        }

        for name in CACHE_FILL_STRIPPED {
            headers.remove(name);
        }
        let proxy = directive.proxy();
        let upstream = self
            .fetcher
            .fetch(
                &proxy.target,
                parts.method.clone(),
                headers,
                Body::empty(),
                proxy.follow_redirects,
            )
            .await?;

        let status = upstream.status();
        if !status.is_success() {
            tracing::debug!(request_id = %request_id, key = %key, status = %status, "Upstream not successful, not caching");
            return Ok(response::from_upstream(upstream, &self.sanitizer));
        }
        if upstream
            .content_length()
            .is_some_and(|len| len > self.max_entity_bytes as u64)
        {
            tracing::debug!(request_id = %request_id, key = %key, "Upstream body over entity limit, not caching");
            return Ok(response::from_upstream(upstream, &self.sanitizer));
        }

        let headers = self.sanitizer.inbound(upstream.headers());
        let body = match response::buffer_limited(upstream, self.max_entity_bytes)
            .await
            .map_err(ProxyError::Body)?
        {
            Buffered::Complete(body) => body,
            Buffered::Oversized(body) => {
                tracing::debug!(request_id = %request_id, key = %key, "Upstream body grew past entity limit, not caching");
                let mut response = Response::new(body);
                *response.status_mut() = status;
                *response.headers_mut() = headers;
                return Ok(response);
            }
        };
        let entity = CachedEntity::new(status, headers, body, ttl_secs)?;

        match self.cache.put(key.clone(), entity.clone()).await {
            Ok(()) => {
                metrics::record_cache_store();
                tracing::info!(
                    request_id = %request_id,
                    key = %key,
                    bytes = entity.body.len(),
                    ttl_secs,
                    "Stored cache entity"
                );
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, key = %key, error = %e, "Cache store failed");
            }
        }

        Ok(apply_conditional(if_none_match, &entity))
    }

    async fn fallback(&self) -> Result<Response, ProxyError> {
        match &self.fallback_url {
            Some(url) => {
                let upstream = self
                    .fetcher
                    .fetch(url, Method::GET, HeaderMap::new(), Body::empty(), true)
                    .await?;
                Ok(response::from_upstream(upstream, &self.sanitizer))
            }
            None => Ok(response::plain(
                StatusCode::NOT_FOUND,
                "No target URL in path",
            )),
        }
    }
}

fn is_cacheable(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

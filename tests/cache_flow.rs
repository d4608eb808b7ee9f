//! End-to-end tests for the edge cache.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use futures_util::future::{self, BoxFuture, FutureExt};
use path_proxy::cache::{CacheError, CacheStore, CachedEntity};
use path_proxy::ProxyConfig;

mod common;

use common::{client, start_mock_upstream, start_proxy, start_proxy_with_store, LARGE_BODY_LEN};

#[tokio::test]
async fn test_second_get_is_served_from_cache() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();
    let url = proxy.url(&format!("/cache/{}", upstream.url("/counter")));

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[header::CACHE_CONTROL], "public, max-age=3600");
    let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    assert_eq!(first.text().await.unwrap(), "count 1");

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()[header::ETAG], etag.as_str());
    assert_eq!(second.text().await.unwrap(), "count 1");

    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_conditional_get() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();
    let url = proxy.url(&format!("/cache/{}", upstream.url("/counter")));

    let first = client.get(&url).send().await.unwrap();
    let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();

    let res = client
        .get(&url)
        .header(header::IF_NONE_MATCH, &etag)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(res.headers()[header::ETAG], etag.as_str());
    assert!(res.bytes().await.unwrap().is_empty());

    let res = client
        .get(&url)
        .header(header::IF_NONE_MATCH, "\"something-else\"")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "count 1");

    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_client_validators_are_not_sent_on_fill() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;

    let res = client()
        .get(proxy.url(&format!("/cache/{}", upstream.url("/text"))))
        .header(header::IF_NONE_MATCH, "\"stale\"")
        .header(header::RANGE, "bytes=0-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let seen = upstream.last_request();
    assert!(seen.headers.get(header::IF_NONE_MATCH).is_none());
    assert!(seen.headers.get(header::RANGE).is_none());
}

#[tokio::test]
async fn test_path_ttl_is_advertised() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;

    let res = client()
        .get(proxy.url(&format!("/cache/600/{}", upstream.url("/text"))))
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()[header::CACHE_CONTROL], "public, max-age=600");
}

#[tokio::test]
async fn test_unsafe_methods_are_never_cached() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();
    let url = proxy.url(&format!("/cache/{}", upstream.url("/counter")));

    for expected in 1..=2 {
        let res = client.post(&url).body("x").send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), format!("count {expected}"));
    }
    let res = client.put(&url).send().await.unwrap();
    assert!(res.headers().get(header::ETAG).is_none());
    client.delete(&url).send().await.unwrap();
    assert_eq!(upstream.hits(), 4);

    // Nothing was stored, so the first GET still goes upstream.
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "count 5");
    assert_eq!(upstream.hits(), 5);
}

#[tokio::test]
async fn test_non_success_is_not_cached() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();

    for _ in 0..2 {
        let res = client
            .get(proxy.url(&format!("/cache/{}", upstream.url("/missing"))))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.headers().get(header::ETAG).is_none());
    }
    assert_eq!(upstream.hits(), 2);

    // A plain cache/ path does not follow redirects, so the 302 is not stored.
    for _ in 0..2 {
        let res = client
            .get(proxy.url(&format!("/cache/{}", upstream.url("/redirect"))))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
    }
    assert_eq!(upstream.hits(), 4);
}

#[tokio::test]
async fn test_nested_all_caches_final_response() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();
    let url = proxy.url(&format!("/cache/30/all/{}", upstream.url("/redirect")));

    for _ in 0..2 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CACHE_CONTROL], "public, max-age=30");
        assert_eq!(res.text().await.unwrap(), "GET /text ");
    }
    // One redirect plus its target, fetched once.
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn test_cache_all_shorthand() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();
    let url = proxy.url(&format!("/cache_all/60/{}", upstream.url("/redirect")));

    for _ in 0..2 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CACHE_CONTROL], "public, max-age=60");
        assert_eq!(res.text().await.unwrap(), "GET /text ");
    }
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn test_cached_length_matches_body() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();
    let url = proxy.url(&format!("/cache/{}", upstream.url("/text")));

    for _ in 0..2 {
        let res = client.get(&url).send().await.unwrap();
        let expected = res.content_length();
        let body = res.bytes().await.unwrap();
        assert_eq!(expected, Some(body.len() as u64));
    }
}

#[tokio::test]
async fn test_oversized_bodies_stream_uncached() {
    let upstream = start_mock_upstream().await;
    let mut config = ProxyConfig::default();
    config.cache.max_entity_bytes = 1024;
    let proxy = start_proxy(config).await;
    let client = client();

    for path in ["/large", "/large-chunked"] {
        let url = proxy.url(&format!("/cache/{}", upstream.url(path)));
        for _ in 0..2 {
            let res = client.get(&url).send().await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "path {path}");
            assert!(res.headers().get(header::ETAG).is_none());
            assert_eq!(res.headers()["access-control-allow-origin"], "*");
            assert_eq!(res.bytes().await.unwrap().len(), LARGE_BODY_LEN);
        }
    }
    assert_eq!(upstream.hits(), 4);
}

#[tokio::test]
async fn test_cached_responses_keep_cookie_isolation() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();
    let url = proxy.url(&format!("/cache/{}", upstream.url("/cookie")));

    for _ in 0..2 {
        let res = client.get(&url).send().await.unwrap();
        assert!(res.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(res.headers()["x-proxy-set-cookie"], "a=b");
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
    }
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_head_miss_is_not_stored() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy(ProxyConfig::default()).await;
    let client = client();
    let url = proxy.url(&format!("/cache/{}", upstream.url("/text")));

    let res = client.head(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(upstream.hits(), 1);

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "GET /text ");
    assert_eq!(upstream.hits(), 2);

    // HEAD is now answered from the stored GET entity.
    let res = client.head(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(header::ETAG));
    assert_eq!(upstream.hits(), 2);
}

/// A store whose backend is always down.
struct BrokenStore;

impl CacheStore for BrokenStore {
    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<CachedEntity>, CacheError>> {
        future::ready(Err(CacheError::Unavailable("offline".into()))).boxed()
    }

    fn put(&self, _key: String, _entity: CachedEntity) -> BoxFuture<'_, Result<(), CacheError>> {
        future::ready(Err(CacheError::Unavailable("offline".into()))).boxed()
    }
}

#[tokio::test]
async fn test_broken_store_degrades_to_proxying() {
    let upstream = start_mock_upstream().await;
    let proxy = start_proxy_with_store(ProxyConfig::default(), Arc::new(BrokenStore)).await;
    let client = client();
    let url = proxy.url(&format!("/cache/{}", upstream.url("/counter")));

    for expected in 1..=2 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), format!("count {expected}"));
    }
    assert_eq!(upstream.hits(), 2);
}

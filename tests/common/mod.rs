//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

use path_proxy::cache::CacheStore;
use path_proxy::{HttpServer, ProxyConfig, Shutdown};

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Default)]
struct UpstreamState {
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Handle to a running mock upstream.
pub struct MockUpstream {
    pub addr: SocketAddr,
    state: UpstreamState,
}

impl MockUpstream {
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.state
            .requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("upstream saw no request")
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub const SLOW_DELAY: Duration = Duration::from_secs(5);
pub const LARGE_BODY_LEN: usize = 64 * 1024;

/// Start a mock upstream on an ephemeral port.
///
/// Paths:
/// - `/redirect` → 302 to `/text`
/// - `/missing` → 404
/// - `/cookie` → 200 with `Set-Cookie: a=b`
/// - `/counter` → 200 with the running hit count
/// - `/slow` → 200 after [`SLOW_DELAY`]
/// - `/large` → 200 with [`LARGE_BODY_LEN`] bytes and a `Content-Length`
/// - `/large-chunked` → the same body, chunked with no `Content-Length`
/// - anything else → 200 echoing method, path and body
pub async fn start_mock_upstream() -> MockUpstream {
    let state = UpstreamState::default();
    let app = Router::new().fallback(upstream_handler).with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream { addr, state }
}

async fn upstream_handler(State(state): State<UpstreamState>, request: Request<Body>) -> Response {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path = parts.uri.path().to_string();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: parts.method.clone(),
        path: path.clone(),
        headers: parts.headers.clone(),
        body: body.clone(),
    });

    match path.as_str() {
        "/redirect" => (StatusCode::FOUND, [(header::LOCATION, "/text")]).into_response(),
        "/missing" => (StatusCode::NOT_FOUND, "nope").into_response(),
        "/cookie" => ([(header::SET_COOKIE, "a=b")], "with cookie").into_response(),
        "/counter" => format!("count {hit}").into_response(),
        "/slow" => {
            tokio::time::sleep(SLOW_DELAY).await;
            "finally".into_response()
        }
        "/large" => vec![b'x'; LARGE_BODY_LEN].into_response(),
        "/large-chunked" => {
            let chunks = (0..LARGE_BODY_LEN / 4096)
                .map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![b'x'; 4096])));
            Body::from_stream(futures_util::stream::iter(chunks)).into_response()
        }
        _ => format!(
            "{} {} {}",
            parts.method,
            path,
            String::from_utf8_lossy(&body)
        )
        .into_response(),
    }
}

/// A running proxy. Dropping it shuts the server down.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    start_server(HttpServer::new(config).unwrap()).await
}

pub async fn start_proxy_with_store(config: ProxyConfig, store: Arc<dyn CacheStore>) -> TestProxy {
    start_server(HttpServer::with_store(config, store).unwrap()).await
}

async fn start_server(server: HttpServer) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

/// Client that talks to the proxy directly and never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener
//! - Hand every request to the dispatcher
//! - Stop on OS signal or shutdown broadcast

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::{CacheStore, MemoryStore};
use crate::config::ProxyConfig;
use crate::error::SetupError;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::MakeRequestUuidV4;
use crate::lifecycle::signals;

const BACKSTOP_GRACE: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the path proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server backed by the in-memory cache store.
    pub fn new(config: ProxyConfig) -> Result<Self, SetupError> {
        let store = Arc::new(MemoryStore::new(config.cache.max_entries));
        Self::with_store(config, store)
    }

    /// Create a server backed by the given cache store.
    pub fn with_store(config: ProxyConfig, store: Arc<dyn CacheStore>) -> Result<Self, SetupError> {
        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(&config, store)?),
        };

        Ok(Self {
            router: Self::build_router(&config, state),
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The dispatcher enforces `timeouts.request_secs` itself; the timeout
    /// layer only catches handlers that overrun it by more than a grace period.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let backstop = Duration::from_secs(config.timeouts.request_secs) + BACKSTOP_GRACE;

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                    .layer(TimeoutLayer::with_status_code(StatusCode::BAD_GATEWAY, backstop)),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.dispatcher.dispatch(request).await
}

/// Wait for an OS signal or a shutdown broadcast.
async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        _ = signals::wait_for_signal() => {}
        _ = shutdown.recv() => {
            tracing::info!("Shutdown requested");
        }
    }
}

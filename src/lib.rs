//! Path-addressed HTTP reverse proxy.
//!
//! The target URL is carried in the request path (`/https://example.com/x`),
//! optionally behind directive prefixes that control redirects, the
//! `Referer` header and edge caching.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, SetupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

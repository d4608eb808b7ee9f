//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the path proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Edge cache settings.
    pub cache: CacheConfig,

    /// Outbound client settings.
    pub upstream: UpstreamConfig,

    /// Names of the cookie escape-hatch headers.
    pub headers: HeaderConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum inbound request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL used when a `cache/` path carries no TTL segment.
    pub default_ttl_secs: u32,

    /// Upper bound for path-supplied TTLs.
    pub max_ttl_secs: u32,

    /// Maximum number of entries held by the in-memory store.
    pub max_entries: usize,

    /// Largest response body that is buffered for caching. Bigger bodies
    /// are streamed to the client uncached.
    pub max_entity_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            max_ttl_secs: 30 * 24 * 3600,
            max_entries: 10_000,
            max_entity_bytes: 32 * 1024 * 1024, // 32MB
        }
    }
}

/// Upstream (outbound) configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// URL fetched for paths that carry no target. A plain 404 is returned when unset.
    pub fallback_url: Option<String>,

    /// Honour HTTP(S)_PROXY environment variables for outbound requests.
    pub use_system_proxy: bool,

    /// User-Agent for outbound requests that arrive without one.
    pub user_agent: Option<String>,
}

/// Escape-hatch header names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Inbound header whose value is forwarded upstream as `Cookie`.
    pub cookie_escape_header: String,

    /// Response header carrying the upstream `Set-Cookie` values.
    pub set_cookie_header: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            cookie_escape_header: "x-proxy-cookie".to_string(),
            set_cookie_header: "x-proxy-set-cookie".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outbound connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed until the response head is ready, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTL bounds, capacity)
//! - Check addresses, URLs and header names parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cache.max_ttl_secs must be at least 1")]
    ZeroMaxTtl,
    #[error("cache.default_ttl_secs must be within [1, {max}], got {value}")]
    DefaultTtlOutOfRange { value: u32, max: u32 },
    #[error("cache.max_entries must be greater than 0")]
    ZeroCapacity,
    #[error("cache.max_entity_bytes must be greater than 0")]
    ZeroEntityLimit,
    #[error("{field} is not a socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("upstream.fallback_url must be an absolute http(s) URL: {0}")]
    InvalidFallbackUrl(String),
    #[error("{field} is not a usable header name: {value}")]
    InvalidHeaderName { field: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.cache.max_ttl_secs == 0 {
        errors.push(ValidationError::ZeroMaxTtl);
    }
    let default_ttl = config.cache.default_ttl_secs;
    if default_ttl == 0 || default_ttl > config.cache.max_ttl_secs {
        errors.push(ValidationError::DefaultTtlOutOfRange {
            value: default_ttl,
            max: config.cache.max_ttl_secs,
        });
    }
    if config.cache.max_entries == 0 {
        errors.push(ValidationError::ZeroCapacity);
    }
    if config.cache.max_entity_bytes == 0 {
        errors.push(ValidationError::ZeroEntityLimit);
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if let Some(fallback) = &config.upstream.fallback_url {
        let ok = Url::parse(fallback)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !ok {
            errors.push(ValidationError::InvalidFallbackUrl(fallback.clone()));
        }
    }

    check_header(&mut errors, "headers.cookie_escape_header", &config.headers.cookie_escape_header);
    check_header(&mut errors, "headers.set_cookie_header", &config.headers.set_cookie_header);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_header(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    // The alias headers must never collide with the cookie headers they replace.
    let usable = HeaderName::from_bytes(value.as_bytes())
        .map(|name| name != axum::http::header::COOKIE && name != axum::http::header::SET_COOKIE)
        .unwrap_or(false);
    if !usable {
        errors.push(ValidationError::InvalidHeaderName {
            field,
            value: value.to_string(),
        });
    }
}

//! Path decoding into directives.
//!
//! # Responsibilities
//! - Repair schemes collapsed by intermediaries (`http:/x` → `http://x`)
//! - Strip the directive prefixes in priority order
//! - Parse and clamp the optional TTL segment of `cache/` paths
//! - Split `set_referer/` paths into referer and target
//!
//! # Design Decisions
//! - Cache prefixes are checked before plain ones so `cache/` can wrap them
//! - A cache directive wraps one proxy directive, never another cache directive
//! - Paths without any recognized prefix are not an error: the caller falls back
//! - Pure: no I/O, no request state (`keep_referer/` is resolved at dispatch)

use std::borrow::Cow;

use thiserror::Error;
use url::Url;

use crate::config::CacheConfig;
use crate::routing::directive::{Directive, ProxyDirective, RefererPolicy};

const CACHE_ALL: &str = "cache_all/";
const CACHE: &str = "cache/";
const ALL: &str = "all/";
const SET_REFERER: &str = "set_referer/";
const KEEP_REFERER: &str = "keep_referer/";

/// Malformed directive paths. All of these map to 400 Bad Request.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("path must continue with an http:// or https:// URL: {0}")]
    MissingTarget(String),
    #[error("set_referer path has no embedded http(s) target URL")]
    MissingRefererTarget,
    #[error("invalid target URL: {0}")]
    InvalidTarget(#[from] url::ParseError),
}

/// Decodes request paths into [`Directive`]s.
#[derive(Debug, Clone)]
pub struct PathRouter {
    default_ttl_secs: u32,
    max_ttl_secs: u32,
}

impl PathRouter {
    pub fn new(config: &CacheConfig) -> Self {
        let max_ttl_secs = config.max_ttl_secs.max(1);
        Self {
            default_ttl_secs: config.default_ttl_secs.clamp(1, max_ttl_secs),
            max_ttl_secs,
        }
    }

    /// Route a path (with or without its leading `/`, query included).
    ///
    /// Returns `Ok(None)` when the path carries no recognized prefix and no
    /// target URL.
    pub fn route(&self, path: &str) -> Result<Option<Directive>, RouteError> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = repair_scheme(path);

        if let Some(rest) = path.strip_prefix(CACHE_ALL) {
            let (ttl_secs, rest) = self.split_ttl(rest);
            let (inner, _) = parse_proxy(&format!("{ALL}{rest}"))?
                .ok_or_else(|| RouteError::MissingTarget(rest.to_string()))?;
            return Ok(Some(Directive::Cache {
                ttl_secs,
                nested: true,
                inner,
            }));
        }

        if let Some(rest) = path.strip_prefix(CACHE) {
            let (ttl_secs, rest) = self.split_ttl(rest);
            let (inner, nested) =
                parse_proxy(rest)?.ok_or_else(|| RouteError::MissingTarget(rest.to_string()))?;
            return Ok(Some(Directive::Cache {
                ttl_secs,
                nested,
                inner,
            }));
        }

        Ok(parse_proxy(&path)?.map(|(proxy, _)| Directive::Proxy(proxy)))
    }

    /// Split an optional leading `<digits>/` TTL segment.
    fn split_ttl<'a>(&self, rest: &'a str) -> (u32, &'a str) {
        if let Some((segment, tail)) = rest.split_once('/') {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                // Overlong digit strings saturate to the maximum.
                let requested = segment.parse::<u64>().unwrap_or(u64::MAX);
                let ttl = requested.clamp(1, u64::from(self.max_ttl_secs));
                return (ttl as u32, tail);
            }
        }
        (self.default_ttl_secs, rest)
    }
}

/// Parse the non-cache forms. The flag reports whether the path used one of
/// the prefixed forms, which makes a wrapping cache directive nested.
fn parse_proxy(path: &str) -> Result<Option<(ProxyDirective, bool)>, RouteError> {
    let (path, follow_redirects) = match path.strip_prefix(ALL) {
        Some(rest) => (rest, true),
        None => (path, false),
    };

    if let Some(rest) = path.strip_prefix(SET_REFERER) {
        let (referer, target) = split_referer(rest)?;
        return Ok(Some((
            ProxyDirective {
                target,
                referer: RefererPolicy::Fixed(referer.to_string()),
                follow_redirects,
            },
            true,
        )));
    }

    if let Some(rest) = path.strip_prefix(KEEP_REFERER) {
        return Ok(Some((
            ProxyDirective {
                target: parse_target(rest)?,
                referer: RefererPolicy::PassThrough,
                follow_redirects,
            },
            true,
        )));
    }

    if is_target(path) {
        let mut proxy = ProxyDirective::plain(parse_target(path)?);
        proxy.follow_redirects = follow_redirects;
        return Ok(Some((proxy, follow_redirects)));
    }

    if follow_redirects {
        return Err(RouteError::MissingTarget(path.to_string()));
    }
    Ok(None)
}

/// Split `<referer>/<url>` at the last embedded `/http(s)://`.
fn split_referer(rest: &str) -> Result<(&str, Url), RouteError> {
    let split = ["/http://", "/https://"]
        .iter()
        .filter_map(|marker| rest.rfind(marker))
        .max()
        .ok_or(RouteError::MissingRefererTarget)?;
    let target = parse_target(&rest[split + 1..])?;
    Ok((&rest[..split], target))
}

fn is_target(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

fn parse_target(path: &str) -> Result<Url, RouteError> {
    if !is_target(path) {
        return Err(RouteError::MissingTarget(path.to_string()));
    }
    Ok(Url::parse(path)?)
}

/// Restore `http:/x` and `https:/x` to `http://x` and `https://x`.
fn repair_scheme(path: &str) -> Cow<'_, str> {
    if !path.contains(":/") {
        return Cow::Borrowed(path);
    }

    let mut repaired = String::with_capacity(path.len() + 2);
    let mut rest = path;
    while let Some(idx) = rest.find(":/") {
        let (head, tail) = rest.split_at(idx);
        let after = &tail[2..];
        repaired.push_str(head);
        if (head.ends_with("http") || head.ends_with("https")) && !after.starts_with('/') {
            repaired.push_str("://");
        } else {
            repaired.push_str(":/");
        }
        rest = after;
    }
    repaired.push_str(rest);
    Cow::Owned(repaired)
}

//! Header sanitization for both directions of the proxy.
//!
//! # Responsibilities
//! - Strip `Origin`, `Cookie`, `Referer` and hop-by-hop headers from outbound requests
//! - Promote the cookie escape-hatch header to `Cookie` upstream
//! - Move upstream `Set-Cookie` values to a non-cookie alias header
//! - Add the fixed CORS / timing header set to every response
//!
//! # Design Decisions
//! - Both directions are pure functions returning a new `HeaderMap`
//! - Third-party cookies never reach the client under a cookie header name
//! - Re-sanitizing a sanitized response map changes nothing

use axum::http::header::{
    self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue,
};

use crate::config::HeaderConfig;
use crate::routing::RefererPolicy;

/// Headers that only apply to a single connection.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Fixed cross-origin headers attached to every response.
pub const CORS_HEADERS: [(HeaderName, &str); 6] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (
        header::ACCESS_CONTROL_ALLOW_METHODS,
        "GET,HEAD,POST,PUT,DELETE,CONNECT,OPTIONS,TRACE,PATCH",
    ),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "*,Authorization"),
    (header::ACCESS_CONTROL_EXPOSE_HEADERS, "*"),
    (header::ACCESS_CONTROL_MAX_AGE, "86400"),
    (HeaderName::from_static("timing-allow-origin"), "*"),
];

/// Insert (or overwrite) the CORS header set.
pub fn apply_cors(headers: &mut HeaderMap) {
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Builds sanitized header sets for the outbound request and the client response.
#[derive(Debug, Clone)]
pub struct HeaderSanitizer {
    cookie_escape: HeaderName,
    set_cookie_alias: HeaderName,
}

impl HeaderSanitizer {
    pub fn new(config: &HeaderConfig) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            cookie_escape: HeaderName::from_bytes(config.cookie_escape_header.as_bytes())?,
            set_cookie_alias: HeaderName::from_bytes(config.set_cookie_header.as_bytes())?,
        })
    }

    /// Headers for the upstream request.
    ///
    /// The inbound `Referer` is only used when the policy passes it through.
    /// Fails only when a fixed referer is not a valid header value.
    pub fn outbound(
        &self,
        inbound: &HeaderMap,
        referer: &RefererPolicy,
    ) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = inbound.clone();
        for name in [
            header::ORIGIN,
            header::COOKIE,
            header::REFERER,
            header::HOST,
            header::CONTENT_LENGTH,
        ] {
            headers.remove(name);
        }
        strip_hop_by_hop(&mut headers);

        if let Some(cookie) = headers.remove(&self.cookie_escape) {
            headers.insert(header::COOKIE, cookie);
        }

        let referer = match referer {
            RefererPolicy::None => None,
            RefererPolicy::Fixed(value) if value.is_empty() => None,
            RefererPolicy::Fixed(value) => Some(HeaderValue::from_str(value)?),
            RefererPolicy::PassThrough => inbound
                .get(header::REFERER)
                .filter(|value| !value.is_empty())
                .cloned(),
        };
        if let Some(referer) = referer {
            headers.insert(header::REFERER, referer);
        }

        Ok(headers)
    }

    /// Headers for the client response.
    pub fn inbound(&self, upstream: &HeaderMap) -> HeaderMap {
        let mut headers = upstream.clone();

        let cookies: Vec<HeaderValue> = headers.get_all(header::SET_COOKIE).iter().cloned().collect();
        if !cookies.is_empty() {
            headers.remove(&self.set_cookie_alias);
            for cookie in cookies {
                headers.append(self.set_cookie_alias.clone(), cookie);
            }
        }
        headers.remove(header::SET_COOKIE);
        headers.remove(header::COOKIE);
        // Framing is recomputed for the body actually sent.
        headers.remove(header::CONTENT_LENGTH);
        strip_hop_by_hop(&mut headers);

        apply_cors(&mut headers);
        headers
    }
}

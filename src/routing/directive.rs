//! Parsed intent of a request path.

use url::Url;

/// How the `Referer` header of the outbound request is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefererPolicy {
    /// No `Referer` is sent upstream.
    None,
    /// A referer fixed by the path (`set_referer/`).
    Fixed(String),
    /// The inbound request's own `Referer` is forwarded (`keep_referer/`).
    PassThrough,
}

/// Cache treatment derived from a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    None,
    /// `cache/<url>`.
    Cache,
    /// `cache/` wrapping `all/`, `set_referer/` or `keep_referer/`.
    Nested,
}

/// A single proxied fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDirective {
    pub target: Url,
    pub referer: RefererPolicy,
    pub follow_redirects: bool,
}

impl ProxyDirective {
    /// A plain fetch: no referer, redirects returned to the client.
    pub fn plain(target: Url) -> Self {
        Self {
            target,
            referer: RefererPolicy::None,
            follow_redirects: false,
        }
    }
}

/// Routing result for a path carrying a target URL.
///
/// A cache directive wraps exactly one proxy directive, so nesting depth is
/// bounded by the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Proxy(ProxyDirective),
    Cache {
        ttl_secs: u32,
        nested: bool,
        inner: ProxyDirective,
    },
}

impl Directive {
    /// The fetch this directive resolves to, cached or not.
    pub fn proxy(&self) -> &ProxyDirective {
        match self {
            Directive::Proxy(p) => p,
            Directive::Cache { inner, .. } => inner,
        }
    }

    pub fn target(&self) -> &Url {
        &self.proxy().target
    }

    pub fn cache_mode(&self) -> CacheMode {
        match self {
            Directive::Proxy(_) => CacheMode::None,
            Directive::Cache { nested: false, .. } => CacheMode::Cache,
            Directive::Cache { nested: true, .. } => CacheMode::Nested,
        }
    }

    /// TTL in seconds for cached directives.
    pub fn ttl_secs(&self) -> Option<u32> {
        match self {
            Directive::Proxy(_) => None,
            Directive::Cache { ttl_secs, .. } => Some(*ttl_secs),
        }
    }

    /// Canonical cache key: the serialized target URL without its fragment.
    pub fn cache_key(&self) -> String {
        let mut url = self.target().clone();
        url.set_fragment(None);
        url.into()
    }

    /// Short label used for metrics and logs.
    pub fn mode_label(&self) -> &'static str {
        match self.cache_mode() {
            CacheMode::None => "proxy",
            CacheMode::Cache => "cache",
            CacheMode::Nested => "cache_nested",
        }
    }
}

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path (+ query)
//!     → router.rs (repair scheme, strip prefixes, parse TTL / referer)
//!     → Return: Directive, no-target, or BadRequest
//!
//! Directive (directive.rs):
//!     Proxy { target, referer policy, redirect policy }
//!     Cache { ttl, inner: Proxy }
//! ```
//!
//! # Design Decisions
//! - The target URL is encoded in the path, there is no route table
//! - Deterministic: same path always yields the same directive
//! - Directives are immutable and live only for one request

pub mod directive;
pub mod router;

pub use directive::{CacheMode, Directive, ProxyDirective, RefererPolicy};
pub use router::{PathRouter, RouteError};

//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request:
//!     → headers.rs (drop Origin/Cookie/Referer, promote escape-hatch cookie)
//!     → Upstream
//!
//! Upstream response:
//!     → headers.rs (rename Set-Cookie, add CORS set)
//!     → Client
//! ```
//!
//! # Design Decisions
//! - The proxy's own origin never receives third-party cookies
//! - Client cookies for the proxy origin never leak to arbitrary upstreams

pub mod headers;

pub use headers::{apply_cors, HeaderSanitizer, CORS_HEADERS};

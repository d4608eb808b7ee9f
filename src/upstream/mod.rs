//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! Directive + sanitized headers
//!     → fetcher.rs (pick redirect policy, attach body)
//!     → target origin
//!     → reqwest::Response (streamed or buffered by the caller)
//! ```

pub mod fetcher;

pub use fetcher::UpstreamFetcher;

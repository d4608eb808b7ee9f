//! Edge cache subsystem.
//!
//! # Data Flow
//! ```text
//! Cacheable request (GET/HEAD on a cache/ path)
//!     → store.rs (get by canonical target URL)
//!     → hit: conditional.rs (304 or full entity)
//!     → miss: fetch upstream, buffer body (2xx only)
//!         → entity.rs (ETag, Cache-Control)
//!         → store.rs (put)
//!         → conditional.rs
//! ```
//!
//! # Design Decisions
//! - ETags are SHA-256 digests of the body and never part of the key
//! - Entities are inserted whole, after the body is fully buffered
//! - Expiry belongs to the store; the dispatcher never re-validates TTLs

pub mod conditional;
pub mod entity;
pub mod memory;
pub mod store;

pub use conditional::apply_conditional;
pub use entity::{etag_for, CachedEntity};
pub use memory::MemoryStore;
pub use store::{CacheError, CacheStore};

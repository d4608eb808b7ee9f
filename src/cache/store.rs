//! Cache store abstraction.

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::cache::entity::CachedEntity;

/// Failure reported by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// A concurrent key-value store for cached entities.
///
/// Implementations own expiry. Concurrent `put`s for one key may race; the
/// last write wins.
pub trait CacheStore: Send + Sync {
    /// Look up a fresh entity.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedEntity>, CacheError>>;

    /// Store an entity, replacing any previous one under `key`.
    fn put(&self, key: String, entity: CachedEntity) -> BoxFuture<'_, Result<(), CacheError>>;
}

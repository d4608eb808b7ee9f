//! In-memory cache store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::cache::entity::CachedEntity;
use crate::cache::store::{CacheError, CacheStore};

/// A thread-safe, bounded in-memory entity store.
///
/// Expiry is enforced lazily: an expired entity reads as a miss and is
/// removed on that read. New keys reserve a slot before they are inserted,
/// so concurrent fills never push the store past `max_entries`.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, CachedEntity>>,
    // Never lower than the number of keys in `inner`.
    slots: Arc<AtomicUsize>,
    max_entries: usize,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            slots: Arc::new(AtomicUsize::new(0)),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every expired entity. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut removed = 0;
        self.inner.retain(|_, entity| {
            let fresh = entity.is_fresh(now);
            if !fresh {
                removed += 1;
            }
            fresh
        });
        self.release(removed);
        removed
    }

    fn lookup(&self, key: &str) -> Option<CachedEntity> {
        let now = SystemTime::now();
        {
            let entry = self.inner.get(key)?;
            if entry.is_fresh(now) {
                return Some(entry.value().clone());
            }
        }
        // The read guard must be released before removing.
        if self
            .inner
            .remove_if(key, |_, entity| !entity.is_fresh(now))
            .is_some()
        {
            self.release(1);
        }
        None
    }

    fn insert(&self, key: String, entity: CachedEntity) {
        if let Some(mut existing) = self.inner.get_mut(&key) {
            *existing = entity;
            return;
        }

        if !self.reserve() {
            let purged = self.purge_expired();
            if !self.reserve() {
                tracing::debug!(
                    key = %key,
                    max_entries = self.max_entries,
                    purged,
                    "Cache full, entity not stored"
                );
                return;
            }
        }

        // Another fill may have inserted the key since the check above.
        if self.inner.insert(key, entity).is_some() {
            self.release(1);
        }
    }

    fn reserve(&self) -> bool {
        self.slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.max_entries).then_some(used + 1)
            })
            .is_ok()
    }

    fn release(&self, count: usize) {
        if count > 0 {
            self.slots.fetch_sub(count, Ordering::AcqRel);
        }
    }
}

impl CacheStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedEntity>, CacheError>> {
        future::ready(Ok(self.lookup(key))).boxed()
    }

    fn put(&self, key: String, entity: CachedEntity) -> BoxFuture<'_, Result<(), CacheError>> {
        self.insert(key, entity);
        future::ready(Ok(())).boxed()
    }
}

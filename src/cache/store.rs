//! Expiring entry store.
//!
//! Holds at most one entry per key. An entry whose age has reached its TTL is
//! treated as absent and dropped on the next lookup. Writers must present the
//! generation they observed before doing their I/O; a `clear` bumps the
//! generation so a fetch that started earlier can never repopulate the store.

use std::{hash::Hash, sync::Mutex};

use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

/// Monotonic counter of `clear` calls.
pub type Generation = u64;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
}

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    generation: Generation,
}

/// Outcome of [`TtlStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Stored,
    /// The store was cleared after the caller observed its generation.
    Superseded,
}

pub struct TtlStore<K: Hash + Eq, V> {
    config: CacheConfig<K>,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> TtlStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(config: CacheConfig<K>) -> Self {
        let entries = LruCache::new(config.capacity_non_zero());
        Self {
            config,
            inner: Mutex::new(Inner {
                entries,
                generation: 0,
            }),
        }
    }

    /// Return the live value for `key`, dropping it first if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let ttl = self.config.ttl_for(key);
        let mut inner = mutex_lock(&self.inner, SOURCE, "get");

        let expired = match inner.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < ttl => {
                counter!("bulletin_content_cache_hit_total").increment(1);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.pop(key);
        }
        counter!("bulletin_content_cache_miss_total").increment(1);
        None
    }

    /// Current generation; capture it before fetching a value to insert.
    pub fn generation(&self) -> Generation {
        mutex_lock(&self.inner, SOURCE, "generation").generation
    }

    /// Store `value` for `key`, replacing any previous entry, unless the store
    /// was cleared since `observed` was read.
    pub fn insert(&self, key: K, value: V, observed: Generation) -> InsertOutcome {
        let mut inner = mutex_lock(&self.inner, SOURCE, "insert");
        if inner.generation != observed {
            debug!(
                observed,
                current = inner.generation,
                "Dropping cache insert that raced with a clear"
            );
            return InsertOutcome::Superseded;
        }

        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = inner.entries.push(key.clone(), entry) {
            if evicted != key {
                counter!("bulletin_content_cache_evict_total").increment(1);
            }
        }
        InsertOutcome::Stored
    }

    /// Drop every entry and invalidate in-flight inserts.
    pub fn clear(&self) {
        let mut inner = mutex_lock(&self.inner, SOURCE, "clear");
        inner.entries.clear();
        inner.generation = inner.generation.wrapping_add(1);
        counter!("bulletin_content_cache_clear_total").increment(1);
    }

    /// Number of entries held, including ones that have expired but not yet been looked up.
    pub fn len(&self) -> usize {
        mutex_lock(&self.inner, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

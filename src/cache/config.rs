//! Cache configuration.
//!
//! Expiry is a single process-wide duration with optional per-key overrides;
//! capacity is an LRU safety net, not the primary eviction policy.

use std::{collections::HashMap, hash::Hash, num::NonZeroUsize, time::Duration};

use crate::domain::content::ContentKey;

pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct CacheConfig<K> {
    /// Maximum age of an entry before it is treated as absent.
    pub default_ttl: Duration,
    /// Keys whose entries expire on a different schedule.
    pub ttl_overrides: HashMap<K, Duration>,
    /// Maximum number of live entries before the least recently used is evicted.
    pub capacity: usize,
}

impl<K> Default for CacheConfig<K> {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            ttl_overrides: HashMap::new(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl<K: Hash + Eq> CacheConfig<K> {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            default_ttl: ttl,
            ..Default::default()
        }
    }

    pub fn ttl_for(&self, key: &K) -> Duration {
        self.ttl_overrides
            .get(key)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig<ContentKey> {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            default_ttl: settings.ttl,
            ttl_overrides: settings.ttl_overrides.clone(),
            capacity: settings.capacity.get(),
        }
    }
}

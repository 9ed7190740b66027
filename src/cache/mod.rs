//! In-memory expiring cache used by the content service.
//!
//! Entries expire after a configurable TTL (process-wide, with optional
//! per-key overrides). Capacity is bounded by an LRU as a safety net:
//!
//! ```toml
//! [cache]
//! ttl_seconds = 60
//! capacity = 100
//!
//! [cache.ttl_overrides]
//! faq = 300
//! ```

mod config;
mod lock;
mod store;

pub use config::CacheConfig;
pub use store::{CacheEntry, Generation, InsertOutcome, TtlStore};

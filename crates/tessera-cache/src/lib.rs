//! Per-repository object cache.
//!
//! [`ObjectCache`] maps keys to already-materialized values. Lookups go
//! through [`ObjectCache::get_or_compute`], which runs the supplied
//! computation at most once per key, even when several threads ask for the
//! same uncached key at the same time. Failed computations leave nothing
//! behind, so a later call retries.
//!
//! # Design Rules
//!
//! 1. One slot per key; contention on a slot never blocks other keys.
//! 2. A failed computation is never cached.
//! 3. Absent results are cached only when negative caching is enabled.
//! 4. Invalidation removes the slot; the next lookup recomputes.

pub mod cache;
pub mod config;

pub use cache::{CacheStats, ObjectCache};
pub use config::CacheConfig;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::CacheConfig;

/// A slot holds either a materialized value or a confirmed-absent marker.
/// An uninitialized slot means "not yet attempted" (or a failed attempt).
type Slot<V> = Arc<OnceCell<Option<V>>>;

enum Miss<E> {
    Absent,
    Failed(E),
}

/// Snapshot of cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from an initialized slot.
    pub hits: u64,
    /// Computations actually run (successful or not).
    pub computations: u64,
}

/// Keyed store of materialized objects with get-or-compute semantics.
///
/// Each key owns its own [`OnceCell`] slot. The map lock is held only long
/// enough to find or create the slot; the computation itself runs outside
/// it, so a slow computation blocks only callers of the same key. `V` is
/// expected to be cheap to clone (typically an `Arc`).
pub struct ObjectCache<K, V> {
    slots: RwLock<HashMap<K, Slot<V>>>,
    config: CacheConfig,
    hits: AtomicU64,
    computations: AtomicU64,
}

impl<K, V> ObjectCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create an empty cache with an explicit configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached value for `key`, computing it on first access.
    ///
    /// `compute` runs at most once per key across all threads. If it fails,
    /// the error is returned and nothing is cached.
    ///
    /// A confirmed-absent marker left by
    /// [`get_or_compute_optional`](Self::get_or_compute_optional) does not
    /// satisfy this call; it is discarded and `compute` runs.
    pub fn get_or_compute<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let mut compute = Some(compute);
        loop {
            let slot = self.slot(key);
            let mut ran = false;
            let cached = slot
                .get_or_try_init(|| {
                    ran = true;
                    match compute.take() {
                        Some(f) => f().map(Some),
                        None => Ok(None),
                    }
                })
                .inspect_err(|_| self.discard_if_empty(key, &slot));
            self.record(ran);

            if let Some(value) = cached? {
                return Ok(value.clone());
            }
            self.discard(key, &slot);
        }
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for computations that
    /// may legitimately find nothing.
    ///
    /// With negative caching enabled, a `None` result is cached and later
    /// calls return `None` without running `compute`. With it disabled,
    /// `None` is returned but the next call computes again.
    pub fn get_or_compute_optional<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<Option<V>, E>,
    ) -> Result<Option<V>, E> {
        let slot = self.slot(key);
        let negative = self.config.negative_caching;
        let mut ran = false;
        let outcome = slot.get_or_try_init(|| {
            ran = true;
            match compute() {
                Ok(Some(value)) => Ok(Some(value)),
                Ok(None) if negative => Ok(None),
                Ok(None) => Err(Miss::Absent),
                Err(e) => Err(Miss::Failed(e)),
            }
        });
        self.record(ran);

        match outcome {
            Ok(value) => Ok(value.clone()),
            Err(miss) => {
                self.discard_if_empty(key, &slot);
                match miss {
                    Miss::Absent => Ok(None),
                    Miss::Failed(e) => Err(e),
                }
            }
        }
    }

    /// The cached value for `key`, without computing anything.
    pub fn get(&self, key: &K) -> Option<V> {
        self.slots
            .read()
            .get(key)
            .and_then(|slot| slot.get())
            .and_then(|value| value.clone())
    }

    /// Returns `true` if `key` holds a value or a confirmed-absent marker.
    pub fn contains(&self, key: &K) -> bool {
        self.slots
            .read()
            .get(key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Drop the entry for `key`. Returns `true` if something was cached.
    pub fn invalidate(&self, key: &K) -> bool {
        self.slots
            .write()
            .remove(key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        let mut slots = self.slots.write();
        let dropped = slots.len();
        slots.clear();
        debug!(dropped, "object cache cleared");
    }

    /// Number of keys holding a value or a confirmed-absent marker.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current hit and computation counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, key: &K) -> Slot<V> {
        if let Some(slot) = self.slots.read().get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write();
        Arc::clone(
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }

    fn discard(&self, key: &K, slot: &Slot<V>) {
        let mut slots = self.slots.write();
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }

    fn discard_if_empty(&self, key: &K, slot: &Slot<V>) {
        if slot.get().is_none() {
            self.discard(key, slot);
        }
    }

    fn record(&self, ran: bool) {
        let counter = if ran { &self.computations } else { &self.hits };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl<K, V> Default for ObjectCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ObjectCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read().len();
        f.debug_struct("ObjectCache")
            .field("slots", &slots)
            .field("negative_caching", &self.config.negative_caching)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn cache() -> ObjectCache<String, Arc<String>> {
        ObjectCache::new()
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    // -----------------------------------------------------------------------
    // get_or_compute
    // -----------------------------------------------------------------------

    #[test]
    fn computes_once_and_returns_same_instance() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(Arc::new("value".to_string()))
        };

        let a = cache.get_or_compute(&key("k"), compute).unwrap();
        let b = cache.get_or_compute(&key("k"), compute).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, computations: 1 });
    }

    #[test]
    fn failure_is_not_cached() {
        let cache = cache();
        let err = cache.get_or_compute(&key("k"), || Err::<Arc<String>, _>("boom"));
        assert_eq!(err.unwrap_err(), "boom");
        assert!(!cache.contains(&key("k")));
        assert!(cache.is_empty());

        let ok = cache
            .get_or_compute(&key("k"), || Ok::<_, &str>(Arc::new("late".into())))
            .unwrap();
        assert_eq!(ok.as_str(), "late");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let cache = cache();
        let first = cache
            .get_or_compute(&key("k"), || Ok::<_, ()>(Arc::new("one".into())))
            .unwrap();
        assert!(cache.invalidate(&key("k")));
        assert!(!cache.invalidate(&key("k")));

        let second = cache
            .get_or_compute(&key("k"), || Ok::<_, ()>(Arc::new("two".into())))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.as_str(), "two");
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let cache = cache();
        for k in ["a", "b", "c"] {
            cache
                .get_or_compute(&key(k), || Ok::<_, ()>(Arc::new(k.to_string())))
                .unwrap();
        }
        assert_eq!(cache.len(), 3);
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(cache.get(&key("a")).is_none());
    }

    // -----------------------------------------------------------------------
    // Negative caching
    // -----------------------------------------------------------------------

    #[test]
    fn absent_result_is_cached_when_enabled() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<Arc<String>>, ()>(None)
        };

        assert!(cache.get_or_compute_optional(&key("ghost"), compute).unwrap().is_none());
        assert!(cache.get_or_compute_optional(&key("ghost"), compute).unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&key("ghost")));
        assert!(cache.get(&key("ghost")).is_none());
    }

    #[test]
    fn absent_result_is_recomputed_when_disabled() {
        let cache: ObjectCache<String, Arc<String>> =
            ObjectCache::with_config(CacheConfig::without_negative_caching());
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<Arc<String>>, ()>(None)
        };

        cache.get_or_compute_optional(&key("ghost"), compute).unwrap();
        cache.get_or_compute_optional(&key("ghost"), compute).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.contains(&key("ghost")));
    }

    #[test]
    fn optional_failure_is_not_cached() {
        let cache = cache();
        let err = cache.get_or_compute_optional(&key("k"), || Err::<Option<Arc<String>>, _>(7));
        assert_eq!(err.unwrap_err(), 7);
        assert!(!cache.contains(&key("k")));
    }

    #[test]
    fn negative_marker_does_not_satisfy_get_or_compute() {
        let cache = cache();
        cache
            .get_or_compute_optional(&key("k"), || Ok::<Option<Arc<String>>, ()>(None))
            .unwrap();

        let value = cache
            .get_or_compute(&key("k"), || Ok::<_, ()>(Arc::new("real".into())))
            .unwrap();
        assert_eq!(value.as_str(), "real");
        assert_eq!(cache.get(&key("k")).as_deref().map(String::as_str), Some("real"));
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_callers_compute_once() {
        let cache = Arc::new(cache());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_compute(&key("shared"), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok::<_, ()>(Arc::new("shared".to_string()))
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn debug_format() {
        let cache = cache();
        let debug = format!("{cache:?}");
        assert!(debug.contains("ObjectCache"));
        assert!(debug.contains("negative_caching"));
    }
}

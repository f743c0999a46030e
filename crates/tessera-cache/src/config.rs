use serde::{Deserialize, Serialize};

/// Configuration for an [`ObjectCache`](crate::ObjectCache).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Remember "confirmed absent" results from
    /// [`get_or_compute_optional`](crate::ObjectCache::get_or_compute_optional)
    /// so repeated misses do not re-run the computation.
    pub negative_caching: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            negative_caching: true,
        }
    }
}

impl CacheConfig {
    /// A configuration that never caches absent results.
    pub fn without_negative_caching() -> Self {
        Self {
            negative_caching: false,
        }
    }
}

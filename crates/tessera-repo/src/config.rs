use serde::{Deserialize, Serialize};
use tessera_cache::CacheConfig;

use crate::error::{RepoError, RepoResult};

/// Configuration of a single repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Name reported in "not found" errors and log lines.
    pub name: String,
    /// Remember ids this repository does not hold.
    pub negative_caching: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            negative_caching: true,
        }
    }
}

impl RepositoryConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml(s: &str) -> RepoResult<Self> {
        toml::from_str(s).map_err(|e| RepoError::InvalidConfig(e.to_string()))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            negative_caching: self.negative_caching,
        }
    }
}

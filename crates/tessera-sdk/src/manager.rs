use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tessera_manifest::{FileSource, ManifestSource};
use tessera_repo::Repository;
use tracing::{debug, info};

use crate::chain::RepositoryChain;
use crate::config::ChainConfig;
use crate::error::{SdkError, SdkResult};

struct Loaded {
    fingerprint: String,
    chain: Arc<RepositoryChain>,
}

/// Owns the current repository chain and replaces it when the manifests
/// on disk change.
///
/// Repositories never reload in place. A reload builds a fresh chain and
/// swaps it in; callers holding the previous chain keep a consistent view
/// until they drop it.
pub struct RepositoryManager {
    config: ChainConfig,
    root: Option<String>,
    current: RwLock<Loaded>,
}

impl RepositoryManager {
    /// Build the chain rooted at the last configured repository.
    pub fn open(config: ChainConfig) -> SdkResult<Self> {
        Self::open_inner(config, None)
    }

    /// Build the chain rooted at `root`.
    pub fn open_with_root(config: ChainConfig, root: &str) -> SdkResult<Self> {
        Self::open_inner(config, Some(root.to_string()))
    }

    fn open_inner(config: ChainConfig, root: Option<String>) -> SdkResult<Self> {
        let loaded = load(&config, root.as_deref())?;
        info!(fingerprint = %loaded.fingerprint, "repository manager opened");
        Ok(Self {
            config,
            root,
            current: RwLock::new(loaded),
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// The current chain.
    pub fn chain(&self) -> Arc<RepositoryChain> {
        self.current.read().chain.clone()
    }

    /// The root repository of the current chain.
    pub fn repository(&self) -> Arc<Repository> {
        self.current.read().chain.root().clone()
    }

    /// BLAKE3 fingerprint (hex) of the manifests the current chain was
    /// built from.
    pub fn fingerprint(&self) -> String {
        self.current.read().fingerprint.clone()
    }

    /// Rebuild the chain if any manifest changed since the last load.
    ///
    /// Returns the replaced chain, or `None` if nothing changed. On error
    /// the current chain stays in place.
    pub fn reload_if_changed(&self) -> SdkResult<Option<Arc<RepositoryChain>>> {
        let manifests = read_manifests(&self.config)?;
        let fingerprint = fingerprint(&self.config, &manifests);
        if fingerprint == self.current.read().fingerprint {
            debug!(fingerprint = %fingerprint, "manifests unchanged");
            return Ok(None);
        }
        let chain = build(&self.config, self.root.as_deref(), manifests)?;
        Ok(Some(self.swap(fingerprint, chain)))
    }

    /// Rebuild the chain unconditionally, returning the replaced one.
    pub fn reload(&self) -> SdkResult<Arc<RepositoryChain>> {
        let loaded = load(&self.config, self.root.as_deref())?;
        Ok(self.swap(loaded.fingerprint, loaded.chain))
    }

    fn swap(&self, fingerprint: String, chain: Arc<RepositoryChain>) -> Arc<RepositoryChain> {
        let mut current = self.current.write();
        info!(
            previous = %current.fingerprint,
            fingerprint = %fingerprint,
            "repository chain reloaded"
        );
        current.fingerprint = fingerprint;
        std::mem::replace(&mut current.chain, chain)
    }
}

impl std::fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("root", &self.root)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

fn load(config: &ChainConfig, root: Option<&str>) -> SdkResult<Loaded> {
    let manifests = read_manifests(config)?;
    let fingerprint = fingerprint(config, &manifests);
    let chain = build(config, root, manifests)?;
    Ok(Loaded { fingerprint, chain })
}

fn read_manifests(config: &ChainConfig) -> SdkResult<Vec<Vec<u8>>> {
    config
        .repositories
        .iter()
        .map(|entry| Ok(FileSource::new(&entry.manifest).read_manifest()?))
        .collect()
}

/// Hash of every manifest, tagged with its repository name.
fn fingerprint(config: &ChainConfig, manifests: &[Vec<u8>]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (entry, bytes) in config.repositories.iter().zip(manifests) {
        hasher.update(entry.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize().as_bytes())
}

fn build(
    config: &ChainConfig,
    root: Option<&str>,
    manifests: Vec<Vec<u8>>,
) -> SdkResult<Arc<RepositoryChain>> {
    let mut by_name: HashMap<&str, Vec<u8>> = config
        .repositories
        .iter()
        .map(|e| e.name.as_str())
        .zip(manifests)
        .collect();
    let chain = RepositoryChain::build_with(config, root, |entry| {
        by_name
            .remove(entry.name.as_str())
            .ok_or_else(|| SdkError::UnknownRepository(entry.name.clone()))
    })?;
    Ok(Arc::new(chain))
}

use std::collections::HashMap;
use std::sync::Arc;

use tessera_manifest::{BytesSource, FileSource, Manifest, ManifestSource};
use tessera_repo::{DirectoryPayloads, Materializer, Repository};
use tracing::info;

use crate::config::{ChainConfig, RepositoryEntry};
use crate::error::{SdkError, SdkResult};

/// A fully built repository chain.
///
/// Holds every configured repository; [`root`](Self::root) is the one
/// client lookups start from.
#[derive(Debug)]
pub struct RepositoryChain {
    repositories: HashMap<String, Arc<Repository>>,
    order: Vec<String>,
    root: Arc<Repository>,
}

impl RepositoryChain {
    /// Build every repository in `config`, reading manifests from disk.
    pub fn build(config: &ChainConfig, root: Option<&str>) -> SdkResult<Self> {
        Self::build_with(config, root, |entry| Ok(FileSource::new(&entry.manifest).read_manifest()?))
    }

    /// Build with manifests supplied by `manifest_bytes`.
    pub(crate) fn build_with(
        config: &ChainConfig,
        root: Option<&str>,
        mut manifest_bytes: impl FnMut(&RepositoryEntry) -> SdkResult<Vec<u8>>,
    ) -> SdkResult<Self> {
        config.validate()?;
        let root_name = match root {
            Some(name) => name,
            None => config
                .default_root()
                .ok_or_else(|| SdkError::InvalidConfig("no repositories configured".into()))?,
        };
        if config.repository(root_name).is_none() {
            return Err(SdkError::UnknownRepository(root_name.to_string()));
        }

        let mut repositories: HashMap<String, Arc<Repository>> = HashMap::new();
        let mut order = Vec::with_capacity(config.repositories.len());
        for entry in &config.repositories {
            let bytes = manifest_bytes(entry)?;
            let manifest = Manifest::load(&BytesSource::new(bytes))?;
            let materializer = Materializer::json(Arc::new(DirectoryPayloads::new(entry.payload_dir())));
            let mut repo = Repository::from_manifest(&entry.repository_config(), manifest, materializer);
            for reference in &entry.references {
                let target = repositories
                    .get(reference)
                    .ok_or_else(|| SdkError::UnknownRepository(reference.clone()))?;
                repo.add_directly_referenced_repository(target.clone());
            }
            repositories.insert(entry.name.clone(), Arc::new(repo));
            order.push(entry.name.clone());
        }

        let root = repositories
            .get(root_name)
            .cloned()
            .ok_or_else(|| SdkError::UnknownRepository(root_name.to_string()))?;
        info!(root = %root.name(), repositories = order.len(), "repository chain built");
        Ok(Self {
            repositories,
            order,
            root,
        })
    }

    pub fn root(&self) -> &Arc<Repository> {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Repository>> {
        self.repositories.get(name)
    }

    /// Repository names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

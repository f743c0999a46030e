use std::sync::Arc;

use tessera_cache::{CacheConfig, CacheStats, ObjectCache};
use tessera_manifest::{Manifest, ManifestEntry};
use tessera_types::{EntryId, EntryKind};

use crate::error::RepoResult;
use crate::materializer::Materializer;
use crate::model::{Component, CustomObject, EnumContent, Generation, RuntimeObject, Table};
use crate::store::{ComponentFilter, RepositoryStore};

/// A read-only store over an immutable manifest.
///
/// Objects are materialized on first access and cached by entry id. Ids
/// the manifest does not know are remembered as absent when negative
/// caching is enabled. A failed materialization caches nothing.
pub struct ManifestStore {
    manifest: Manifest,
    materializer: Materializer,
    cache: ObjectCache<EntryId, RuntimeObject>,
}

impl ManifestStore {
    pub fn new(manifest: Manifest, materializer: Materializer, config: CacheConfig) -> Self {
        Self {
            manifest,
            materializer,
            cache: ObjectCache::with_config(config),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The object for entry `id` if it has the expected kind.
    fn object(&self, id: &str, kind: EntryKind) -> RepoResult<Option<RuntimeObject>> {
        let key = EntryId::new(id);
        let object = self.cache.get_or_compute_optional(&key, || {
            match self.manifest.entry_by_id(id) {
                Some(entry) => self.materializer.materialize(&self.manifest, entry).map(Some),
                None => Ok(None),
            }
        })?;
        Ok(object.filter(|o| o.kind() == kind))
    }

    fn entry_object(&self, entry: Option<&ManifestEntry>) -> RepoResult<Option<RuntimeObject>> {
        match entry {
            Some(entry) => self.object(entry.id.as_str(), entry.kind),
            None => Ok(None),
        }
    }

    fn tables_from<'a>(
        &self,
        entries: impl Iterator<Item = &'a ManifestEntry>,
    ) -> RepoResult<Vec<Arc<Table>>> {
        let mut tables = Vec::new();
        for entry in entries {
            if let Some(table) = self.entry_object(Some(entry))?.and_then(RuntimeObject::into_table) {
                tables.push(table);
            }
        }
        Ok(tables)
    }
}

impl RepositoryStore for ManifestStore {
    fn component(&self, id: &str) -> RepoResult<Option<Arc<Component>>> {
        Ok(self
            .object(id, EntryKind::Component)?
            .and_then(RuntimeObject::into_component))
    }

    fn component_by_version(
        &self,
        kind_id: &str,
        version_id: &str,
    ) -> RepoResult<Option<Arc<Component>>> {
        Ok(self
            .entry_object(self.manifest.component_entry(kind_id, version_id))?
            .and_then(RuntimeObject::into_component))
    }

    fn component_ids(&self, filter: &ComponentFilter) -> Vec<EntryId> {
        self.manifest
            .entries_of_kind(EntryKind::Component)
            .filter(|e| {
                filter.matches(
                    e.kind_id.as_deref().unwrap_or_default(),
                    e.type_name.as_deref(),
                )
            })
            .map(|e| e.id.clone())
            .collect()
    }

    fn generation(&self, id: &str) -> RepoResult<Option<Arc<Generation>>> {
        Ok(self
            .object(id, EntryKind::Generation)?
            .and_then(RuntimeObject::into_generation))
    }

    fn table(&self, qualified_name: &str) -> RepoResult<Option<Arc<Table>>> {
        let entry = self
            .manifest
            .entry_by_qualified_name(EntryKind::Table, qualified_name);
        Ok(self.entry_object(entry)?.and_then(RuntimeObject::into_table))
    }

    fn tables_of_type(&self, type_name: &str) -> RepoResult<Vec<Arc<Table>>> {
        self.tables_from(self.manifest.entries_of_type(EntryKind::Table, type_name))
    }

    fn tables(&self) -> RepoResult<Vec<Arc<Table>>> {
        self.tables_from(self.manifest.entries_of_kind(EntryKind::Table))
    }

    fn enum_content(&self, value_type: &str) -> RepoResult<Option<Arc<EnumContent>>> {
        let entry = self
            .manifest
            .entries_of_type(EntryKind::EnumContent, value_type)
            .next();
        Ok(self
            .entry_object(entry)?
            .and_then(RuntimeObject::into_enum_content))
    }

    fn custom_object(&self, id: &str) -> RepoResult<Option<Arc<CustomObject>>> {
        Ok(self
            .object(id, EntryKind::Custom)?
            .and_then(RuntimeObject::into_custom))
    }

    fn test_case(&self, id: &str) -> RepoResult<Option<Arc<CustomObject>>> {
        Ok(self
            .object(id, EntryKind::TestCase)?
            .and_then(RuntimeObject::into_test_case))
    }

    fn invalidate(&self, id: &str) -> bool {
        self.cache.invalidate(&EntryId::new(id))
    }

    fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl std::fmt::Debug for ManifestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestStore")
            .field("entries", &self.manifest.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

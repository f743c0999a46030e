//! The repository resolution chain.
//!
//! A [`Repository`] answers lookups from its own store first, then from
//! the repositories it references: depth first, left to right, in the order
//! they were added. A repository reachable along several paths is visited
//! once, at its first position. The first repository that holds an object
//! answers; errors stop the walk immediately.

use std::collections::HashSet;
use std::sync::Arc;

use tessera_manifest::Manifest;
use tessera_types::{EffectiveDate, EntryId, EntryKind};
use tracing::{debug, trace};

use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};
use crate::generation::GenerationRef;
use crate::lookup::{EnumValueLookupService, LookupServiceRegistry};
use crate::manifest_store::ManifestStore;
use crate::materializer::Materializer;
use crate::model::{Component, CustomObject, EnumValue, Generation, Table};
use crate::store::{ComponentFilter, RepositoryStore};

/// A node in the repository delegation graph.
///
/// References are added while the repository is still exclusively owned
/// (`&mut self`); once it is shared behind an `Arc` the chain is fixed.
/// A repository can therefore only reference repositories built before it,
/// which rules out cycles.
pub struct Repository {
    name: String,
    store: Arc<dyn RepositoryStore>,
    references: Vec<Arc<Repository>>,
    lookups: LookupServiceRegistry,
}

impl Repository {
    pub fn new(name: impl Into<String>, store: Arc<dyn RepositoryStore>) -> Self {
        Self {
            name: name.into(),
            store,
            references: Vec::new(),
            lookups: LookupServiceRegistry::new(),
        }
    }

    /// A repository backed by `manifest`, materializing through `materializer`.
    pub fn from_manifest(
        config: &RepositoryConfig,
        manifest: Manifest,
        materializer: Materializer,
    ) -> Self {
        debug!(
            repository = %config.name,
            entries = manifest.len(),
            negative_caching = config.negative_caching,
            "creating manifest repository"
        );
        let store = ManifestStore::new(manifest, materializer, config.cache_config());
        Self::new(config.name.clone(), Arc::new(store))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<dyn RepositoryStore> {
        &self.store
    }

    // ---- Chain ----

    /// Append `other` to the directly referenced repositories.
    ///
    /// Returns `false` (and changes nothing) if `other` is already directly
    /// referenced.
    pub fn add_directly_referenced_repository(&mut self, other: Arc<Repository>) -> bool {
        if self.references.iter().any(|r| Arc::ptr_eq(r, &other)) {
            return false;
        }
        debug!(repository = %self.name, referenced = %other.name, "adding referenced repository");
        self.references.push(other);
        true
    }

    pub fn directly_referenced_repositories(&self) -> &[Arc<Repository>] {
        &self.references
    }

    /// Every repository reachable from this one, pre-order, each once.
    pub fn all_referenced_repositories(&self) -> Vec<Arc<Repository>> {
        fn visit(repo: &Repository, out: &mut Vec<Arc<Repository>>) {
            for child in &repo.references {
                if out.iter().any(|seen| Arc::ptr_eq(seen, child)) {
                    continue;
                }
                out.push(child.clone());
                visit(child, out);
            }
        }
        let mut out = Vec::new();
        visit(self, &mut out);
        out
    }

    /// This repository followed by every referenced one, in lookup order.
    fn resolution_order(&self) -> Vec<&Repository> {
        fn visit<'r>(repo: &'r Repository, out: &mut Vec<&'r Repository>) {
            for child in &repo.references {
                let child: &Repository = child;
                if out.iter().any(|seen| std::ptr::eq(*seen, child)) {
                    continue;
                }
                out.push(child);
                visit(child, out);
            }
        }
        let mut out = vec![self];
        visit(self, &mut out);
        out
    }

    /// First hit of `lookup` along the chain, with the repository that
    /// produced it.
    fn find<T>(
        &self,
        mut lookup: impl FnMut(&Repository) -> RepoResult<Option<T>>,
    ) -> RepoResult<Option<(&Repository, T)>> {
        for repo in self.resolution_order() {
            if let Some(found) = lookup(repo)? {
                if !std::ptr::eq(repo, self) {
                    trace!(repository = %self.name, resolved_in = %repo.name, "resolved through chain");
                }
                return Ok(Some((repo, found)));
            }
        }
        Ok(None)
    }

    fn find_value<T>(
        &self,
        lookup: impl FnMut(&Repository) -> RepoResult<Option<T>>,
    ) -> RepoResult<Option<T>> {
        Ok(self.find(lookup)?.map(|(_, value)| value))
    }

    // ---- Components ----

    pub fn component(&self, id: &str) -> RepoResult<Option<Arc<Component>>> {
        self.find_value(|r| r.store.component(id))
    }

    /// Like [`component`](Self::component), but absence is an error.
    pub fn existing_component(&self, id: &str) -> RepoResult<Arc<Component>> {
        self.component(id)?.ok_or_else(|| self.component_not_found(id))
    }

    pub fn component_by_version(
        &self,
        kind_id: &str,
        version_id: &str,
    ) -> RepoResult<Option<Arc<Component>>> {
        self.find_value(|r| r.store.component_by_version(kind_id, version_id))
    }

    /// All components matching `filter` along the chain. When several
    /// repositories hold the same id, the first in lookup order wins.
    pub fn all_components(&self, filter: &ComponentFilter) -> RepoResult<Vec<Arc<Component>>> {
        let mut seen = HashSet::new();
        let mut components = Vec::new();
        for repo in self.resolution_order() {
            for id in repo.store.component_ids(filter) {
                if !seen.insert(id.clone()) {
                    continue;
                }
                if let Some(component) = repo.store.component(id.as_str())? {
                    components.push(component);
                }
            }
        }
        Ok(components)
    }

    /// Ids of all components along the chain, without duplicates.
    pub fn component_ids(&self) -> Vec<EntryId> {
        let mut seen = HashSet::new();
        self.resolution_order()
            .into_iter()
            .flat_map(|r| r.store.component_ids(&ComponentFilter::All))
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    // ---- Generations ----

    /// The generation of `component_id` effective at `date`.
    ///
    /// The generation is read from the repository that holds the component.
    pub fn generation(
        &self,
        component_id: &str,
        date: EffectiveDate,
    ) -> RepoResult<Option<Arc<Generation>>> {
        match self.find(|r| r.store.component(component_id))? {
            Some((owner, component)) => match component.generations.effective_at(date) {
                Some(generation) => owner.load_generation(generation).map(Some),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Like [`generation`](Self::generation), but absence is an error that
    /// tells a missing component apart from a missing generation.
    pub fn existing_generation(
        &self,
        component_id: &str,
        date: EffectiveDate,
    ) -> RepoResult<Arc<Generation>> {
        let (owner, component) = self
            .find(|r| r.store.component(component_id))?
            .ok_or_else(|| self.component_not_found(component_id))?;
        match component.generations.effective_at(date) {
            Some(generation) => owner.load_generation(generation),
            None => Err(RepoError::GenerationNotFound {
                component_id: component_id.to_string(),
                date,
                repository: self.name.clone(),
            }),
        }
    }

    pub fn latest_generation(&self, component_id: &str) -> RepoResult<Option<Arc<Generation>>> {
        self.navigate(component_id, |c| c.generations.latest().cloned())
    }

    /// The generation following `generation` in its component.
    pub fn next_generation(&self, generation: &Generation) -> RepoResult<Option<Arc<Generation>>> {
        self.navigate(generation.component_id.as_str(), |c| {
            c.generations.next_after(generation.valid_from).cloned()
        })
    }

    /// The generation preceding `generation` in its component.
    pub fn previous_generation(
        &self,
        generation: &Generation,
    ) -> RepoResult<Option<Arc<Generation>>> {
        self.navigate(generation.component_id.as_str(), |c| {
            c.generations.previous_before(generation.valid_from).cloned()
        })
    }

    /// Every generation of `component_id`, oldest first, including any
    /// that start at or after the component's `valid_to`.
    pub fn generations(&self, component_id: &str) -> RepoResult<Vec<Arc<Generation>>> {
        match self.find(|r| r.store.component(component_id))? {
            Some((owner, component)) => component
                .generations
                .iter()
                .map(|g| owner.load_generation(g))
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    /// Number of generations of `component_id`, if the component exists.
    pub fn generation_count(&self, component_id: &str) -> RepoResult<Option<usize>> {
        Ok(self.component(component_id)?.map(|c| c.generation_count()))
    }

    fn navigate(
        &self,
        component_id: &str,
        pick: impl FnOnce(&Component) -> Option<GenerationRef>,
    ) -> RepoResult<Option<Arc<Generation>>> {
        match self.find(|r| r.store.component(component_id))? {
            Some((owner, component)) => match pick(component.as_ref()) {
                Some(generation) => owner.load_generation(&generation).map(Some),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn load_generation(&self, generation: &GenerationRef) -> RepoResult<Arc<Generation>> {
        self.store
            .generation(generation.id.as_str())?
            .ok_or_else(|| RepoError::Materialization {
                id: generation.id.clone(),
                kind: EntryKind::Generation,
                reason: format!("indexed generation missing from repository {}", self.name),
            })
    }

    // ---- Tables ----

    pub fn table(&self, qualified_name: &str) -> RepoResult<Option<Arc<Table>>> {
        self.find_value(|r| r.store.table(qualified_name))
    }

    pub fn existing_table(&self, qualified_name: &str) -> RepoResult<Arc<Table>> {
        self.table(qualified_name)?
            .ok_or_else(|| RepoError::TableNotFound {
                name: qualified_name.to_string(),
                repository: self.name.clone(),
            })
    }

    /// The first table of `type_name` in lookup order.
    pub fn table_of_type(&self, type_name: &str) -> RepoResult<Option<Arc<Table>>> {
        self.find_value(|r| Ok(r.store.tables_of_type(type_name)?.into_iter().next()))
    }

    /// All tables of `type_name` along the chain, first name wins.
    pub fn tables_of_type(&self, type_name: &str) -> RepoResult<Vec<Arc<Table>>> {
        self.collect_tables(|r| r.store.tables_of_type(type_name))
    }

    pub fn all_tables(&self) -> RepoResult<Vec<Arc<Table>>> {
        self.collect_tables(|r| r.store.tables())
    }

    fn collect_tables(
        &self,
        mut tables: impl FnMut(&Repository) -> RepoResult<Vec<Arc<Table>>>,
    ) -> RepoResult<Vec<Arc<Table>>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for repo in self.resolution_order() {
            for table in tables(repo)? {
                if seen.insert(table.qualified_name.clone()) {
                    out.push(table);
                }
            }
        }
        Ok(out)
    }

    // ---- Enum values ----

    /// This repository's lookup services.
    pub fn lookup_services(&self) -> &LookupServiceRegistry {
        &self.lookups
    }

    /// Register a lookup service on this repository, replacing any previous
    /// service for the same value type.
    pub fn register_lookup_service(
        &self,
        service: Arc<dyn EnumValueLookupService>,
    ) -> Option<Arc<dyn EnumValueLookupService>> {
        self.lookups.register(service)
    }

    /// The first lookup service for `value_type` along the chain.
    pub fn lookup_service(&self, value_type: &str) -> Option<Arc<dyn EnumValueLookupService>> {
        self.resolution_order()
            .into_iter()
            .find_map(|r| r.lookups.get(value_type))
    }

    /// All values of `value_type`.
    ///
    /// A lookup service registered anywhere along the chain takes
    /// precedence over enum content; otherwise the first repository holding
    /// content for the type answers. Unknown types have no values.
    pub fn enum_values(&self, value_type: &str) -> RepoResult<Vec<EnumValue>> {
        if let Some(service) = self.lookup_service(value_type) {
            return service.values();
        }
        Ok(self
            .find_value(|r| r.store.enum_content(value_type))?
            .map(|content| content.values.clone())
            .unwrap_or_default())
    }

    pub fn enum_value(&self, value_type: &str, id: &str) -> RepoResult<Option<EnumValue>> {
        if let Some(service) = self.lookup_service(value_type) {
            return service.value(id);
        }
        Ok(self
            .find_value(|r| r.store.enum_content(value_type))?
            .and_then(|content| content.value(id).cloned()))
    }

    pub fn existing_enum_value(&self, value_type: &str, id: &str) -> RepoResult<EnumValue> {
        self.enum_value(value_type, id)?
            .ok_or_else(|| RepoError::EnumValueNotFound {
                value_type: value_type.to_string(),
                id: id.to_string(),
                repository: self.name.clone(),
            })
    }

    // ---- Other objects ----

    pub fn custom_object(&self, id: &str) -> RepoResult<Option<Arc<CustomObject>>> {
        self.find_value(|r| r.store.custom_object(id))
    }

    pub fn test_case(&self, id: &str) -> RepoResult<Option<Arc<CustomObject>>> {
        self.find_value(|r| r.store.test_case(id))
    }

    // ---- Cache control ----

    /// Drop this repository's cached state for `id`.
    pub fn invalidate(&self, id: &str) -> bool {
        self.store.invalidate(id)
    }

    /// Drop all of this repository's cached state.
    pub fn invalidate_all(&self) {
        debug!(repository = %self.name, "invalidating all cached objects");
        self.store.invalidate_all();
    }

    fn component_not_found(&self, id: &str) -> RepoError {
        RepoError::ComponentNotFound {
            id: id.to_string(),
            repository: self.name.clone(),
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let references: Vec<&str> = self.references.iter().map(|r| r.name()).collect();
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("references", &references)
            .field("lookups", &self.lookups)
            .finish()
    }
}

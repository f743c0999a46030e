use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tessera_types::EntryId;

use crate::error::RepoResult;
use crate::generation::{GenerationIndex, GenerationRef};
use crate::model::{Component, CustomObject, EnumContent, Generation, Table};
use crate::store::{ComponentFilter, RepositoryStore};

#[derive(Default)]
struct Contents {
    components: BTreeMap<EntryId, Arc<Component>>,
    generations: BTreeMap<EntryId, Arc<Generation>>,
    tables: BTreeMap<String, Arc<Table>>,
    enums: BTreeMap<String, Arc<EnumContent>>,
    custom: BTreeMap<EntryId, Arc<CustomObject>>,
    test_cases: BTreeMap<EntryId, Arc<CustomObject>>,
}

/// Modifiable in-memory store.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock`
/// and handed out as shared `Arc`s; replacing an object never affects
/// handles obtained earlier. Listing order is id order.
#[derive(Default)]
pub struct InMemoryStore {
    contents: RwLock<Contents>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a component together with all of its generations.
    ///
    /// The component's generation index is rebuilt from `generations`, and
    /// every generation is re-parented onto the component.
    pub fn put_component(
        &self,
        mut component: Component,
        generations: Vec<Generation>,
    ) -> RepoResult<Arc<Component>> {
        let refs = generations
            .iter()
            .map(|g| GenerationRef::new(g.id.clone(), g.valid_from))
            .collect();
        component.generations = GenerationIndex::build(&component.id, refs, component.valid_to)?;
        let component = Arc::new(component);

        let mut contents = self.contents.write();
        if let Some(old) = contents.components.remove(&component.id) {
            for g in old.generations.iter() {
                contents.generations.remove(&g.id);
            }
        }
        for mut generation in generations {
            generation.component_id = component.id.clone();
            contents
                .generations
                .insert(generation.id.clone(), Arc::new(generation));
        }
        contents
            .components
            .insert(component.id.clone(), component.clone());
        Ok(component)
    }

    /// Remove a component and its generations. Returns `true` if it existed.
    pub fn remove_component(&self, id: &str) -> bool {
        let mut contents = self.contents.write();
        match contents.components.remove(id) {
            Some(old) => {
                for g in old.generations.iter() {
                    contents.generations.remove(&g.id);
                }
                true
            }
            None => false,
        }
    }

    pub fn put_table(&self, table: Table) -> Arc<Table> {
        let table = Arc::new(table);
        self.contents
            .write()
            .tables
            .insert(table.qualified_name.clone(), table.clone());
        table
    }

    pub fn remove_table(&self, qualified_name: &str) -> bool {
        self.contents.write().tables.remove(qualified_name).is_some()
    }

    /// Insert or replace the enum content for its value type.
    pub fn put_enum_content(&self, content: EnumContent) -> Arc<EnumContent> {
        let content = Arc::new(content);
        self.contents
            .write()
            .enums
            .insert(content.type_name.clone(), content.clone());
        content
    }

    pub fn put_custom_object(&self, object: CustomObject) -> Arc<CustomObject> {
        let object = Arc::new(object);
        self.contents
            .write()
            .custom
            .insert(object.id.clone(), object.clone());
        object
    }

    pub fn put_test_case(&self, test_case: CustomObject) -> Arc<CustomObject> {
        let test_case = Arc::new(test_case);
        self.contents
            .write()
            .test_cases
            .insert(test_case.id.clone(), test_case.clone());
        test_case
    }

    /// Remove everything.
    pub fn clear(&self) {
        *self.contents.write() = Contents::default();
    }

    pub fn component_count(&self) -> usize {
        self.contents.read().components.len()
    }
}

impl RepositoryStore for InMemoryStore {
    fn component(&self, id: &str) -> RepoResult<Option<Arc<Component>>> {
        Ok(self.contents.read().components.get(id).cloned())
    }

    fn component_by_version(
        &self,
        kind_id: &str,
        version_id: &str,
    ) -> RepoResult<Option<Arc<Component>>> {
        Ok(self
            .contents
            .read()
            .components
            .values()
            .find(|c| c.kind_id == kind_id && c.version_id == version_id)
            .cloned())
    }

    fn component_ids(&self, filter: &ComponentFilter) -> Vec<EntryId> {
        self.contents
            .read()
            .components
            .values()
            .filter(|c| filter.matches(&c.kind_id, c.type_name.as_deref()))
            .map(|c| c.id.clone())
            .collect()
    }

    fn generation(&self, id: &str) -> RepoResult<Option<Arc<Generation>>> {
        Ok(self.contents.read().generations.get(id).cloned())
    }

    fn table(&self, qualified_name: &str) -> RepoResult<Option<Arc<Table>>> {
        Ok(self.contents.read().tables.get(qualified_name).cloned())
    }

    fn tables_of_type(&self, type_name: &str) -> RepoResult<Vec<Arc<Table>>> {
        Ok(self
            .contents
            .read()
            .tables
            .values()
            .filter(|t| t.type_name == type_name)
            .cloned()
            .collect())
    }

    fn tables(&self) -> RepoResult<Vec<Arc<Table>>> {
        Ok(self.contents.read().tables.values().cloned().collect())
    }

    fn enum_content(&self, value_type: &str) -> RepoResult<Option<Arc<EnumContent>>> {
        Ok(self.contents.read().enums.get(value_type).cloned())
    }

    fn custom_object(&self, id: &str) -> RepoResult<Option<Arc<CustomObject>>> {
        Ok(self.contents.read().custom.get(id).cloned())
    }

    fn test_case(&self, id: &str) -> RepoResult<Option<Arc<CustomObject>>> {
        Ok(self.contents.read().test_cases.get(id).cloned())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let contents = self.contents.read();
        f.debug_struct("InMemoryStore")
            .field("components", &contents.components.len())
            .field("tables", &contents.tables.len())
            .field("enums", &contents.enums.len())
            .finish()
    }
}

use std::sync::Arc;

use tessera_types::EntryId;

use crate::error::RepoResult;
use crate::model::{Component, CustomObject, EnumContent, Generation, Table};

/// Which components [`RepositoryStore::component_ids`] should list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ComponentFilter {
    #[default]
    All,
    /// Components of one kind id.
    KindId(String),
    /// Components whose implementation type is this name.
    TypeName(String),
}

impl ComponentFilter {
    pub fn matches(&self, kind_id: &str, type_name: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::KindId(k) => k == kind_id,
            Self::TypeName(t) => type_name == Some(t.as_str()),
        }
    }
}

/// The objects held by a single repository, without delegation.
///
/// Every lookup answers `Ok(None)` when the object is not held here.
/// `Err` is reserved for objects that exist but cannot be produced.
///
/// Implementations must be safe to query from many threads at once.
pub trait RepositoryStore: Send + Sync {
    fn component(&self, id: &str) -> RepoResult<Option<Arc<Component>>>;

    fn component_by_version(
        &self,
        kind_id: &str,
        version_id: &str,
    ) -> RepoResult<Option<Arc<Component>>>;

    /// Ids of the components matching `filter`, in store order.
    fn component_ids(&self, filter: &ComponentFilter) -> Vec<EntryId>;

    /// A generation by its own id.
    fn generation(&self, id: &str) -> RepoResult<Option<Arc<Generation>>>;

    /// A table by qualified name.
    fn table(&self, qualified_name: &str) -> RepoResult<Option<Arc<Table>>>;

    /// All tables whose rows are of `type_name`, in store order.
    fn tables_of_type(&self, type_name: &str) -> RepoResult<Vec<Arc<Table>>>;

    fn tables(&self) -> RepoResult<Vec<Arc<Table>>>;

    /// The enum content holding values of `value_type`.
    fn enum_content(&self, value_type: &str) -> RepoResult<Option<Arc<EnumContent>>>;

    fn custom_object(&self, id: &str) -> RepoResult<Option<Arc<CustomObject>>>;

    fn test_case(&self, id: &str) -> RepoResult<Option<Arc<CustomObject>>>;

    /// Drop any cached state for `id`. Returns `true` if something was dropped.
    fn invalidate(&self, _id: &str) -> bool {
        false
    }

    /// Drop all cached state.
    fn invalidate_all(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matching() {
        assert!(ComponentFilter::All.matches("Policy", None));
        assert!(ComponentFilter::KindId("Policy".into()).matches("Policy", None));
        assert!(!ComponentFilter::KindId("Policy".into()).matches("Coverage", None));
        let by_type = ComponentFilter::TypeName("MotorPolicy".into());
        assert!(by_type.matches("Policy", Some("MotorPolicy")));
        assert!(!by_type.matches("Policy", None));
    }
}

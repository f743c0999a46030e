use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::RepoResult;
use crate::model::EnumValue;

/// Provides enumerated values that live outside the manifest.
pub trait EnumValueLookupService: Send + Sync {
    /// The value type this service answers for.
    fn value_type(&self) -> &str;

    /// All values, in display order.
    fn values(&self) -> RepoResult<Vec<EnumValue>>;

    /// A single value by id.
    fn value(&self, id: &str) -> RepoResult<Option<EnumValue>> {
        Ok(self.values()?.into_iter().find(|v| v.id == id))
    }
}

/// A fixed list of values, mainly for tests and static configuration.
#[derive(Clone, Debug)]
pub struct StaticLookupService {
    value_type: String,
    values: Vec<EnumValue>,
}

impl StaticLookupService {
    pub fn new(value_type: impl Into<String>, ids: &[&str]) -> Self {
        let value_type = value_type.into();
        let values = ids
            .iter()
            .map(|id| EnumValue::new(value_type.clone(), *id))
            .collect();
        Self { value_type, values }
    }

    pub fn from_values(value_type: impl Into<String>, values: Vec<EnumValue>) -> Self {
        Self {
            value_type: value_type.into(),
            values,
        }
    }
}

impl EnumValueLookupService for StaticLookupService {
    fn value_type(&self) -> &str {
        &self.value_type
    }

    fn values(&self) -> RepoResult<Vec<EnumValue>> {
        Ok(self.values.clone())
    }
}

/// Lookup services of one repository, keyed by value type.
///
/// Registration may happen at any time, including after the repository is
/// shared; a new registration for a type replaces the previous one.
#[derive(Default)]
pub struct LookupServiceRegistry {
    services: RwLock<HashMap<String, Arc<dyn EnumValueLookupService>>>,
}

impl LookupServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` for its value type, returning the one it replaces.
    pub fn register(
        &self,
        service: Arc<dyn EnumValueLookupService>,
    ) -> Option<Arc<dyn EnumValueLookupService>> {
        let value_type = service.value_type().to_string();
        debug!(value_type = %value_type, "registering lookup service");
        self.services.write().insert(value_type, service)
    }

    pub fn unregister(&self, value_type: &str) -> Option<Arc<dyn EnumValueLookupService>> {
        self.services.write().remove(value_type)
    }

    pub fn get(&self, value_type: &str) -> Option<Arc<dyn EnumValueLookupService>> {
        self.services.read().get(value_type).cloned()
    }

    /// Registered value types, sorted.
    pub fn value_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.services.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}

impl std::fmt::Debug for LookupServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupServiceRegistry")
            .field("value_types", &self.value_types())
            .finish()
    }
}

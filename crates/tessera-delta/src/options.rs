//! Comparison policy for the delta engine.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::object::DiffObject;
use crate::value::{is_no_value, values_equal};

/// How the elements of a composition are matched between the two graphs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonMethod {
    /// Match elements by logical identity
    /// ([`ComparisonOptions::is_same`]), then compare their properties.
    #[default]
    ByObject,
    /// Match elements by content: same type and equal properties. An
    /// element whose content changed shows up as removed plus added.
    ByContent,
}

/// Policy callbacks consulted while computing a delta.
pub trait ComparisonOptions {
    /// Whether `original` and `reference` are the same logical object.
    ///
    /// Used to pair up elements of to-many associations. Typically compares
    /// a stable business key, never memory addresses.
    fn is_same(&self, original: &dyn DiffObject, reference: &dyn DiffObject) -> bool;

    /// Matching method for the association with the given label.
    fn method(&self, _association: &str) -> ComparisonMethod {
        ComparisonMethod::ByObject
    }

    /// Whether to skip `property` of objects of type `type_name`.
    fn ignore(&self, _type_name: &str, _property: &str) -> bool {
        false
    }

    /// Whether to compare properties only, never following associations.
    fn ignore_associations(&self) -> bool {
        false
    }

    /// Whether reordering within a to-many association is ignored.
    fn ignore_moved(&self) -> bool {
        false
    }

    /// Whether added and removed objects list their composed descendants
    /// as child deltas.
    fn create_subtree_delta(&self) -> bool {
        false
    }
}

type SameFn = dyn Fn(&dyn DiffObject, &dyn DiffObject) -> bool + Send + Sync;

#[derive(Clone)]
enum Identity {
    /// Same type name and equal, present values of this property.
    KeyProperty(String),
    Custom(Arc<SameFn>),
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::KeyProperty(name) => write!(f, "KeyProperty({name})"),
            Identity::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Builder-style [`ComparisonOptions`] implementation.
///
/// ```
/// use tessera_delta::{ComparisonMethod, DeltaOptions};
///
/// let options = DeltaOptions::keyed_by("id")
///     .with_method("coverages", ComparisonMethod::ByContent)
///     .ignoring_property("lastModified")
///     .with_subtree_delta(true);
/// # let _ = options;
/// ```
#[derive(Clone, Debug)]
pub struct DeltaOptions {
    identity: Identity,
    default_method: ComparisonMethod,
    methods: HashMap<String, ComparisonMethod>,
    ignored_everywhere: HashSet<String>,
    ignored: HashSet<(String, String)>,
    ignore_associations: bool,
    ignore_moved: bool,
    create_subtree_delta: bool,
}

impl Default for DeltaOptions {
    fn default() -> Self {
        Self::keyed_by("id")
    }
}

impl DeltaOptions {
    /// Objects are the same if they have the same type name and equal,
    /// present values of `property`.
    pub fn keyed_by(property: impl Into<String>) -> Self {
        Self::with_identity_rule(Identity::KeyProperty(property.into()))
    }

    /// Objects are the same if `same` says so.
    pub fn with_identity<F>(same: F) -> Self
    where
        F: Fn(&dyn DiffObject, &dyn DiffObject) -> bool + Send + Sync + 'static,
    {
        Self::with_identity_rule(Identity::Custom(Arc::new(same)))
    }

    fn with_identity_rule(identity: Identity) -> Self {
        Self {
            identity,
            default_method: ComparisonMethod::ByObject,
            methods: HashMap::new(),
            ignored_everywhere: HashSet::new(),
            ignored: HashSet::new(),
            ignore_associations: false,
            ignore_moved: false,
            create_subtree_delta: false,
        }
    }

    /// Method used for associations without an explicit override.
    pub fn with_default_method(mut self, method: ComparisonMethod) -> Self {
        self.default_method = method;
        self
    }

    /// Override the method for one association label.
    pub fn with_method(mut self, association: impl Into<String>, method: ComparisonMethod) -> Self {
        self.methods.insert(association.into(), method);
        self
    }

    /// Skip `property` on objects of `type_name`.
    pub fn ignoring(mut self, type_name: impl Into<String>, property: impl Into<String>) -> Self {
        self.ignored.insert((type_name.into(), property.into()));
        self
    }

    /// Skip `property` on objects of every type.
    pub fn ignoring_property(mut self, property: impl Into<String>) -> Self {
        self.ignored_everywhere.insert(property.into());
        self
    }

    pub fn with_ignore_associations(mut self, ignore: bool) -> Self {
        self.ignore_associations = ignore;
        self
    }

    pub fn with_ignore_moved(mut self, ignore: bool) -> Self {
        self.ignore_moved = ignore;
        self
    }

    pub fn with_subtree_delta(mut self, create: bool) -> Self {
        self.create_subtree_delta = create;
        self
    }
}

impl ComparisonOptions for DeltaOptions {
    fn is_same(&self, original: &dyn DiffObject, reference: &dyn DiffObject) -> bool {
        match &self.identity {
            Identity::KeyProperty(key) => {
                if original.type_name() != reference.type_name() {
                    return false;
                }
                match (original.property(key), reference.property(key)) {
                    (Some(a), Some(b)) => !is_no_value(&a) && values_equal(&a, &b),
                    _ => false,
                }
            }
            Identity::Custom(same) => same(original, reference),
        }
    }

    fn method(&self, association: &str) -> ComparisonMethod {
        self.methods
            .get(association)
            .copied()
            .unwrap_or(self.default_method)
    }

    fn ignore(&self, type_name: &str, property: &str) -> bool {
        self.ignored_everywhere.contains(property)
            || self
                .ignored
                .contains(&(type_name.to_string(), property.to_string()))
    }

    fn ignore_associations(&self) -> bool {
        self.ignore_associations
    }

    fn ignore_moved(&self) -> bool {
        self.ignore_moved
    }

    fn create_subtree_delta(&self) -> bool {
        self.create_subtree_delta
    }
}

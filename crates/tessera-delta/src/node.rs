use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::object::{Association, AssociationKind, DiffObject, Targets};

/// An owned association of an [`ObjectNode`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeAssociation {
    pub label: String,
    pub composition: bool,
    pub to_many: bool,
    pub targets: Vec<ObjectNode>,
}

/// An owned, acyclic object graph node.
///
/// `ObjectNode` is the simplest way to feed arbitrary data to the delta
/// engine: project the domain objects into nodes, then diff the nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    pub type_name: String,
    pub properties: Vec<(String, Value)>,
    pub associations: Vec<NodeAssociation>,
}

impl ObjectNode {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Set a property, replacing any earlier value of the same name.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((name, value)),
        }
        self
    }

    /// Add a to-one composition.
    pub fn with_child(self, label: impl Into<String>, child: ObjectNode) -> Self {
        self.with_association(label.into(), true, false, vec![child])
    }

    /// Add a to-many composition.
    pub fn with_children(self, label: impl Into<String>, children: Vec<ObjectNode>) -> Self {
        self.with_association(label.into(), true, true, children)
    }

    /// Add a to-one reference.
    pub fn with_reference(self, label: impl Into<String>, target: ObjectNode) -> Self {
        self.with_association(label.into(), false, false, vec![target])
    }

    /// Add a to-many reference.
    pub fn with_references(self, label: impl Into<String>, targets: Vec<ObjectNode>) -> Self {
        self.with_association(label.into(), false, true, targets)
    }

    fn with_association(
        mut self,
        label: String,
        composition: bool,
        to_many: bool,
        targets: Vec<ObjectNode>,
    ) -> Self {
        self.associations.push(NodeAssociation {
            label,
            composition,
            to_many,
            targets,
        });
        self
    }
}

impl DiffObject for ObjectNode {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn properties(&self) -> Vec<(&str, Value)> {
        self.properties
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect()
    }

    fn associations(&self) -> Vec<Association<'_>> {
        self.associations
            .iter()
            .map(|a| {
                let targets = if a.to_many {
                    Targets::ToMany(a.targets.iter().map(|t| t as &dyn DiffObject).collect())
                } else {
                    Targets::ToOne(a.targets.first().map(|t| t as &dyn DiffObject))
                };
                Association {
                    label: &a.label,
                    kind: if a.composition {
                        AssociationKind::Composition
                    } else {
                        AssociationKind::Reference
                    },
                    targets,
                }
            })
            .collect()
    }
}

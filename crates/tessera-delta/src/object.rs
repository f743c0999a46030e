use std::fmt;

use serde_json::Value;

/// Ownership semantics of an association.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// The parent owns its targets. Matched targets are compared property
    /// by property and their own children are diffed recursively.
    Composition,
    /// The parent merely points at its targets. Only additions, removals,
    /// and reordering are tracked; targets are never descended into.
    Reference,
}

/// The targets of one association.
#[derive(Clone, Debug)]
pub enum Targets<'a> {
    ToOne(Option<&'a dyn DiffObject>),
    ToMany(Vec<&'a dyn DiffObject>),
}

impl<'a> Targets<'a> {
    /// Returns `true` for to-many associations.
    pub fn is_to_many(&self) -> bool {
        matches!(self, Targets::ToMany(_))
    }

    /// All targets, in order.
    pub fn to_vec(&self) -> Vec<&'a dyn DiffObject> {
        match self {
            Targets::ToOne(target) => target.iter().copied().collect(),
            Targets::ToMany(targets) => targets.clone(),
        }
    }

    /// The single target of a to-one association (the first target of a
    /// to-many one).
    pub fn first(&self) -> Option<&'a dyn DiffObject> {
        match self {
            Targets::ToOne(target) => *target,
            Targets::ToMany(targets) => targets.first().copied(),
        }
    }
}

/// A labelled association from one object to zero or more others.
#[derive(Clone, Debug)]
pub struct Association<'a> {
    pub label: &'a str,
    pub kind: AssociationKind,
    pub targets: Targets<'a>,
}

impl<'a> Association<'a> {
    pub fn composition(label: &'a str, targets: Targets<'a>) -> Self {
        Self {
            label,
            kind: AssociationKind::Composition,
            targets,
        }
    }

    pub fn reference(label: &'a str, targets: Targets<'a>) -> Self {
        Self {
            label,
            kind: AssociationKind::Reference,
            targets,
        }
    }
}

/// An object as seen by the delta engine.
///
/// Implementations expose a type name, their property values in declaration
/// order, and their outgoing associations. The graph reachable through
/// associations must be acyclic; the engine does no cycle detection.
pub trait DiffObject: fmt::Debug {
    /// Implementation type name, passed to
    /// [`ComparisonOptions::ignore`](crate::ComparisonOptions::ignore).
    fn type_name(&self) -> &str;

    /// Property values in declaration order.
    fn properties(&self) -> Vec<(&str, Value)>;

    /// Outgoing associations.
    fn associations(&self) -> Vec<Association<'_>> {
        Vec::new()
    }

    /// The value of a single property.
    fn property(&self, name: &str) -> Option<Value> {
        self.properties()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

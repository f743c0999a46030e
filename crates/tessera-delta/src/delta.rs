//! The delta tree.

use std::fmt;

use serde_json::Value;

use crate::object::DiffObject;

/// How one object differs between the original and reference graphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    /// Present on both sides with equal properties.
    Unchanged,
    /// Present on both sides with at least one differing property.
    Changed,
    /// Present only in the reference graph.
    Added,
    /// Present only in the original graph.
    Removed,
    /// Present on both sides at a different position within a to-many
    /// association. Property changes, if any, are still recorded.
    Moved,
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Moved => "moved",
        };
        f.write_str(s)
    }
}

/// A single property whose value differs.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDelta {
    pub name: String,
    pub original: Value,
    pub reference: Value,
}

/// A node of the delta tree.
///
/// Borrows the compared objects for `'a`; it never refers back to the
/// repository they came from. Once the engine returns, the tree is not
/// modified further.
#[derive(Clone, Debug)]
pub struct ModelObjectDelta<'a> {
    original: Option<&'a dyn DiffObject>,
    reference: Option<&'a dyn DiffObject>,
    kind: DeltaKind,
    association: Option<String>,
    changed_properties: Vec<PropertyDelta>,
    child_deltas: Vec<ModelObjectDelta<'a>>,
}

impl<'a> ModelObjectDelta<'a> {
    pub(crate) fn new(
        original: Option<&'a dyn DiffObject>,
        reference: Option<&'a dyn DiffObject>,
        kind: DeltaKind,
        association: Option<&str>,
    ) -> Self {
        Self {
            original,
            reference,
            kind,
            association: association.map(str::to_string),
            changed_properties: Vec::new(),
            child_deltas: Vec::new(),
        }
    }

    /// A root delta for two absent snapshots.
    pub fn empty() -> Self {
        Self::new(None, None, DeltaKind::Unchanged, None)
    }

    pub(crate) fn set_changed_properties(&mut self, properties: Vec<PropertyDelta>) {
        self.changed_properties = properties;
    }

    pub(crate) fn push_child(&mut self, child: ModelObjectDelta<'a>) {
        self.child_deltas.push(child);
    }

    pub fn kind(&self) -> DeltaKind {
        self.kind
    }

    pub fn is_unchanged(&self) -> bool {
        self.kind == DeltaKind::Unchanged
    }

    pub fn is_changed(&self) -> bool {
        self.kind == DeltaKind::Changed
    }

    pub fn is_added(&self) -> bool {
        self.kind == DeltaKind::Added
    }

    pub fn is_removed(&self) -> bool {
        self.kind == DeltaKind::Removed
    }

    pub fn is_moved(&self) -> bool {
        self.kind == DeltaKind::Moved
    }

    /// The object as it was in the original graph.
    pub fn original_object(&self) -> Option<&'a dyn DiffObject> {
        self.original
    }

    /// The object as it is in the reference graph.
    pub fn reference_object(&self) -> Option<&'a dyn DiffObject> {
        self.reference
    }

    /// The reference object if present, else the original.
    pub fn object(&self) -> Option<&'a dyn DiffObject> {
        self.reference.or(self.original)
    }

    /// Label of the association this delta was found under (`None` for the root).
    pub fn association(&self) -> Option<&str> {
        self.association.as_deref()
    }

    pub fn changed_properties(&self) -> &[PropertyDelta] {
        &self.changed_properties
    }

    /// The change recorded for one property, if it differs.
    pub fn property_delta(&self, name: &str) -> Option<&PropertyDelta> {
        self.changed_properties.iter().find(|p| p.name == name)
    }

    pub fn child_deltas(&self) -> &[ModelObjectDelta<'a>] {
        &self.child_deltas
    }

    /// Child deltas found under one association label.
    pub fn child_deltas_for<'s>(
        &'s self,
        association: &'s str,
    ) -> impl Iterator<Item = &'s ModelObjectDelta<'a>> + 's {
        self.child_deltas
            .iter()
            .filter(move |d| d.association() == Some(association))
    }

    /// `true` if neither this object nor anything below it differs.
    pub fn is_empty(&self) -> bool {
        self.kind == DeltaKind::Unchanged
            && self.changed_properties.is_empty()
            && self.child_deltas.is_empty()
    }

    /// `true` if anything in this subtree differs.
    pub fn has_changes(&self) -> bool {
        !self.is_empty()
    }

    /// This delta and all descendants, depth first, parents before children.
    pub fn iter(&self) -> DeltaIter<'_, 'a> {
        DeltaIter { stack: vec![self] }
    }
}

/// Pre-order iterator over a delta tree.
pub struct DeltaIter<'d, 'a> {
    stack: Vec<&'d ModelObjectDelta<'a>>,
}

impl<'d, 'a> Iterator for DeltaIter<'d, 'a> {
    type Item = &'d ModelObjectDelta<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.child_deltas.iter().rev());
        Some(next)
    }
}

impl fmt::Display for ModelObjectDelta<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

impl ModelObjectDelta<'_> {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let type_name = self.object().map_or("<none>", |o| o.type_name());
        write!(f, "{:indent$}{} {}", "", self.kind, type_name, indent = depth * 2)?;
        if let Some(label) = &self.association {
            write!(f, " via {label}")?;
        }
        for p in &self.changed_properties {
            write!(f, " [{}: {} -> {}]", p.name, p.original, p.reference)?;
        }
        writeln!(f)?;
        for child in &self.child_deltas {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

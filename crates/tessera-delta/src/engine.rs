//! Delta computation.
//!
//! Entry points:
//!
//! - [`diff_root`] compares two root snapshots and everything they compose.
//! - [`diff_child`] / [`diff_children`] add the deltas of one to-one or
//!   to-many composition to an existing parent delta.
//! - [`diff_associated_child`] / [`diff_associated`] do the same for
//!   reference associations, tracking only additions, removals, and moves.
//!
//! Child deltas are emitted in the reference sequence's order, followed by
//! removals in the original sequence's order. A matched child whose index
//! in the reference sequence differs from its index in the original is
//! reported as moved, even when nothing else about it changed; insertions
//! and removals before it therefore move it too. Use
//! [`ignore_moved`](crate::ComparisonOptions::ignore_moved) to suppress
//! this. Otherwise children that are identical on both sides produce no
//! delta.

use serde_json::Value;
use tracing::trace;

use crate::delta::{DeltaKind, ModelObjectDelta, PropertyDelta};
use crate::object::{Association, AssociationKind, DiffObject};
use crate::options::{ComparisonMethod, ComparisonOptions};
use crate::value::values_equal;

/// Compare two snapshots of a root object.
///
/// With both snapshots present the root delta is `Changed` or `Unchanged`
/// depending on the root's own properties; differences further down are
/// reported as child deltas. A missing original yields an `Added` root and
/// a missing reference a `Removed` one.
pub fn diff_root<'a>(
    original: Option<&'a dyn DiffObject>,
    reference: Option<&'a dyn DiffObject>,
    options: &dyn ComparisonOptions,
) -> ModelObjectDelta<'a> {
    let engine = Engine { options };
    match (original, reference) {
        (Some(o), Some(r)) => engine.compare(o, r, None, false),
        (None, Some(r)) => engine.added(r, None),
        (Some(o), None) => engine.removed(o, None),
        (None, None) => ModelObjectDelta::empty(),
    }
}

/// Diff a to-one composition and append the result to `parent`.
pub fn diff_child<'a>(
    parent: &mut ModelObjectDelta<'a>,
    original: Option<&'a dyn DiffObject>,
    reference: Option<&'a dyn DiffObject>,
    association: &str,
    options: &dyn ComparisonOptions,
) {
    Engine { options }.to_one(parent, original, reference, association);
}

/// Diff a to-many composition and append the results to `parent`.
pub fn diff_children<'a>(
    parent: &mut ModelObjectDelta<'a>,
    original: &[&'a dyn DiffObject],
    reference: &[&'a dyn DiffObject],
    association: &str,
    options: &dyn ComparisonOptions,
) {
    Engine { options }.to_many(parent, original, reference, association);
}

/// Diff a to-one reference association and append the result to `parent`.
///
/// The target is replaced (one `Added` plus one `Removed` delta) when the
/// two targets are not the same logical object; its properties are never
/// compared.
pub fn diff_associated_child<'a>(
    parent: &mut ModelObjectDelta<'a>,
    original: Option<&'a dyn DiffObject>,
    reference: Option<&'a dyn DiffObject>,
    association: &str,
    options: &dyn ComparisonOptions,
) {
    Engine { options }.associated_to_one(parent, original, reference, association);
}

/// Diff a to-many reference association and append the results to `parent`.
pub fn diff_associated<'a>(
    parent: &mut ModelObjectDelta<'a>,
    original: &[&'a dyn DiffObject],
    reference: &[&'a dyn DiffObject],
    association: &str,
    options: &dyn ComparisonOptions,
) {
    Engine { options }.associated_to_many(parent, original, reference, association);
}

struct Engine<'o> {
    options: &'o dyn ComparisonOptions,
}

/// Result of pairing two sequences: for each reference element, the index
/// of its original counterpart (if any) and whether it moved.
struct Matching {
    pairs: Vec<Option<(usize, bool)>>,
    unmatched_original: Vec<usize>,
}

impl<'o> Engine<'o> {
    fn compare<'a>(
        &self,
        original: &'a dyn DiffObject,
        reference: &'a dyn DiffObject,
        association: Option<&str>,
        moved: bool,
    ) -> ModelObjectDelta<'a> {
        let changed = self.property_deltas(original, reference);
        let kind = if moved {
            DeltaKind::Moved
        } else if changed.is_empty() {
            DeltaKind::Unchanged
        } else {
            DeltaKind::Changed
        };

        let mut delta = ModelObjectDelta::new(Some(original), Some(reference), kind, association);
        delta.set_changed_properties(changed);
        if !self.options.ignore_associations() {
            self.associations(&mut delta, original, reference);
        }
        delta
    }

    fn added<'a>(&self, object: &'a dyn DiffObject, association: Option<&str>) -> ModelObjectDelta<'a> {
        let mut delta = ModelObjectDelta::new(None, Some(object), DeltaKind::Added, association);
        if self.expands_subtrees() {
            for assoc in composed(object) {
                for target in assoc.targets.to_vec() {
                    delta.push_child(self.added(target, Some(assoc.label)));
                }
            }
        }
        delta
    }

    fn removed<'a>(&self, object: &'a dyn DiffObject, association: Option<&str>) -> ModelObjectDelta<'a> {
        let mut delta = ModelObjectDelta::new(Some(object), None, DeltaKind::Removed, association);
        if self.expands_subtrees() {
            for assoc in composed(object) {
                for target in assoc.targets.to_vec() {
                    delta.push_child(self.removed(target, Some(assoc.label)));
                }
            }
        }
        delta
    }

    fn expands_subtrees(&self) -> bool {
        self.options.create_subtree_delta() && !self.options.ignore_associations()
    }

    fn property_deltas(&self, original: &dyn DiffObject, reference: &dyn DiffObject) -> Vec<PropertyDelta> {
        let type_name = reference.type_name();
        let old = original.properties();
        let new = reference.properties();

        let mut names: Vec<&str> = old.iter().map(|(n, _)| *n).collect();
        for (name, _) in &new {
            if !names.contains(name) {
                names.push(*name);
            }
        }

        names
            .into_iter()
            .filter(|name| !self.options.ignore(type_name, name))
            .filter_map(|name| {
                let a = value_of(&old, name);
                let b = value_of(&new, name);
                (!values_equal(&a, &b)).then(|| PropertyDelta {
                    name: name.to_string(),
                    original: a,
                    reference: b,
                })
            })
            .collect()
    }

    fn associations<'a>(
        &self,
        delta: &mut ModelObjectDelta<'a>,
        original: &'a dyn DiffObject,
        reference: &'a dyn DiffObject,
    ) {
        let old = original.associations();
        let new = reference.associations();

        let mut labels: Vec<&str> = new.iter().map(|a| a.label).collect();
        for assoc in &old {
            if !labels.contains(&assoc.label) {
                labels.push(assoc.label);
            }
        }

        for label in labels {
            let old_assoc = old.iter().find(|a| a.label == label);
            let new_assoc = new.iter().find(|a| a.label == label);
            let Some(shape) = new_assoc.or(old_assoc) else {
                continue;
            };
            let to_many = old_assoc.is_some_and(|a| a.targets.is_to_many())
                || new_assoc.is_some_and(|a| a.targets.is_to_many());
            let old_targets = old_assoc.map(|a| a.targets.to_vec()).unwrap_or_default();
            let new_targets = new_assoc.map(|a| a.targets.to_vec()).unwrap_or_default();

            match (shape.kind, to_many) {
                (AssociationKind::Composition, true) => {
                    self.to_many(delta, &old_targets, &new_targets, label)
                }
                (AssociationKind::Composition, false) => self.to_one(
                    delta,
                    old_targets.first().copied(),
                    new_targets.first().copied(),
                    label,
                ),
                (AssociationKind::Reference, true) => {
                    self.associated_to_many(delta, &old_targets, &new_targets, label)
                }
                (AssociationKind::Reference, false) => self.associated_to_one(
                    delta,
                    old_targets.first().copied(),
                    new_targets.first().copied(),
                    label,
                ),
            }
        }
    }

    fn matches(&self, method: ComparisonMethod, a: &dyn DiffObject, b: &dyn DiffObject) -> bool {
        match method {
            ComparisonMethod::ByObject => self.options.is_same(a, b),
            ComparisonMethod::ByContent => {
                a.type_name() == b.type_name() && self.property_deltas(a, b).is_empty()
            }
        }
    }

    /// Pair every reference element with the first unclaimed original
    /// element it matches. A matched element is moved when its index in
    /// the reference sequence differs from its index in the original.
    fn pair(
        &self,
        original: &[&dyn DiffObject],
        reference: &[&dyn DiffObject],
        matches: impl Fn(&dyn DiffObject, &dyn DiffObject) -> bool,
    ) -> Matching {
        let mut claimed = vec![false; original.len()];
        let pairs = reference
            .iter()
            .enumerate()
            .map(|(position, r)| {
                let hit = (0..original.len()).find(|&i| !claimed[i] && matches(original[i], *r));
                hit.map(|i| {
                    claimed[i] = true;
                    (i, i != position)
                })
            })
            .collect();

        let unmatched_original = (0..original.len()).filter(|&i| !claimed[i]).collect();
        Matching {
            pairs,
            unmatched_original,
        }
    }

    fn to_one<'a>(
        &self,
        parent: &mut ModelObjectDelta<'a>,
        original: Option<&'a dyn DiffObject>,
        reference: Option<&'a dyn DiffObject>,
        label: &str,
    ) {
        match (original, reference) {
            (None, None) => {}
            (None, Some(r)) => parent.push_child(self.added(r, Some(label))),
            (Some(o), None) => parent.push_child(self.removed(o, Some(label))),
            (Some(o), Some(r)) => {
                if self.matches(self.options.method(label), o, r) {
                    let delta = self.compare(o, r, Some(label), false);
                    if delta.has_changes() {
                        parent.push_child(delta);
                    }
                } else {
                    parent.push_child(self.added(r, Some(label)));
                    parent.push_child(self.removed(o, Some(label)));
                }
            }
        }
    }

    fn to_many<'a>(
        &self,
        parent: &mut ModelObjectDelta<'a>,
        original: &[&'a dyn DiffObject],
        reference: &[&'a dyn DiffObject],
        label: &str,
    ) {
        let method = self.options.method(label);
        let matching = self.pair(original, reference, |a, b| self.matches(method, a, b));
        trace!(
            association = label,
            original = original.len(),
            reference = reference.len(),
            "diffing composition"
        );

        for (r, pair) in reference.iter().zip(matching.pairs) {
            match pair {
                None => parent.push_child(self.added(*r, Some(label))),
                Some((i, moved)) => {
                    let moved = moved && !self.options.ignore_moved();
                    let delta = self.compare(original[i], *r, Some(label), moved);
                    if delta.has_changes() {
                        parent.push_child(delta);
                    }
                }
            }
        }
        for i in matching.unmatched_original {
            parent.push_child(self.removed(original[i], Some(label)));
        }
    }

    fn associated_to_one<'a>(
        &self,
        parent: &mut ModelObjectDelta<'a>,
        original: Option<&'a dyn DiffObject>,
        reference: Option<&'a dyn DiffObject>,
        label: &str,
    ) {
        let leaf = |object: &'a dyn DiffObject, kind: DeltaKind| match kind {
            DeltaKind::Added => ModelObjectDelta::new(None, Some(object), kind, Some(label)),
            _ => ModelObjectDelta::new(Some(object), None, kind, Some(label)),
        };
        match (original, reference) {
            (None, None) => {}
            (None, Some(r)) => parent.push_child(leaf(r, DeltaKind::Added)),
            (Some(o), None) => parent.push_child(leaf(o, DeltaKind::Removed)),
            (Some(o), Some(r)) => {
                if !self.options.is_same(o, r) {
                    parent.push_child(leaf(r, DeltaKind::Added));
                    parent.push_child(leaf(o, DeltaKind::Removed));
                }
            }
        }
    }

    fn associated_to_many<'a>(
        &self,
        parent: &mut ModelObjectDelta<'a>,
        original: &[&'a dyn DiffObject],
        reference: &[&'a dyn DiffObject],
        label: &str,
    ) {
        let matching = self.pair(original, reference, |a, b| self.options.is_same(a, b));

        for (r, pair) in reference.iter().zip(matching.pairs) {
            match pair {
                None => parent.push_child(ModelObjectDelta::new(
                    None,
                    Some(*r),
                    DeltaKind::Added,
                    Some(label),
                )),
                Some((i, true)) if !self.options.ignore_moved() => {
                    parent.push_child(ModelObjectDelta::new(
                        Some(original[i]),
                        Some(*r),
                        DeltaKind::Moved,
                        Some(label),
                    ))
                }
                Some(_) => {}
            }
        }
        for i in matching.unmatched_original {
            parent.push_child(ModelObjectDelta::new(
                Some(original[i]),
                None,
                DeltaKind::Removed,
                Some(label),
            ));
        }
    }
}

/// A property's value, `Null` when the object does not declare it.
fn value_of(properties: &[(&str, Value)], name: &str) -> Value {
    properties
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v.clone())
        .unwrap_or(Value::Null)
}

fn composed(object: &dyn DiffObject) -> impl Iterator<Item = Association<'_>> {
    object
        .associations()
        .into_iter()
        .filter(|a| a.kind == AssociationKind::Composition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ObjectNode;
    use crate::options::DeltaOptions;
    use serde_json::json;

    fn obj(id: &str) -> ObjectNode {
        ObjectNode::new("TestObject").with_property("id", id)
    }

    fn as_dyn(nodes: &[ObjectNode]) -> Vec<&dyn DiffObject> {
        nodes.iter().map(|n| n as &dyn DiffObject).collect()
    }

    fn root() -> ObjectNode {
        ObjectNode::new("Root").with_property("id", "root")
    }

    // -----------------------------------------------------------------------
    // Root comparison
    // -----------------------------------------------------------------------

    #[test]
    fn identical_graphs_are_unchanged() {
        let build = || {
            root().with_property("name", "policy").with_children(
                "children",
                vec![
                    obj("A").with_property("prop", 1),
                    obj("B").with_children("grand", vec![obj("B1")]),
                ],
            )
        };
        let (old, new) = (build(), build());
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());

        assert_eq!(delta.kind(), DeltaKind::Unchanged);
        assert!(delta.child_deltas().is_empty());
        assert!(delta.is_empty());
    }

    #[test]
    fn root_property_change() {
        let old = root().with_property("name", "a");
        let new = root().with_property("name", "b");
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());

        assert!(delta.is_changed());
        let p = delta.property_delta("name").unwrap();
        assert_eq!(p.original, json!("a"));
        assert_eq!(p.reference, json!("b"));
    }

    #[test]
    fn root_against_nothing() {
        let node = root();
        let options = DeltaOptions::default();
        assert!(diff_root(None, Some(&node), &options).is_added());
        assert!(diff_root(Some(&node), None, &options).is_removed());
        assert!(diff_root(None, None, &options).is_empty());
    }

    #[test]
    fn blank_and_null_properties_are_equal() {
        let old = root().with_property("note", "");
        let new = root().with_property("note", serde_json::Value::Null);
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());
        assert!(delta.is_unchanged());
    }

    #[test]
    fn property_missing_on_one_side_is_no_value() {
        let old = root().with_property("extra", "  ");
        let new = root();
        assert!(diff_root(Some(&old), Some(&new), &DeltaOptions::default()).is_unchanged());

        let old = root().with_property("extra", 5);
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());
        assert_eq!(delta.property_delta("extra").unwrap().reference, json!(null));
    }

    #[test]
    fn ignored_properties_are_skipped() {
        let old = root().with_property("modified", "monday").with_property("x", 1);
        let new = root().with_property("modified", "tuesday").with_property("x", 1);
        let options = DeltaOptions::default().ignoring("Root", "modified");
        assert!(diff_root(Some(&old), Some(&new), &options).is_unchanged());
    }

    // -----------------------------------------------------------------------
    // Compositions
    // -----------------------------------------------------------------------

    #[test]
    fn changed_child_yields_one_property_delta() {
        let old = root().with_children("children", vec![obj("Child").with_property("prop", 0)]);
        let new = root().with_children("children", vec![obj("Child").with_property("prop", 42)]);
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::keyed_by("id"));

        assert_eq!(delta.child_deltas().len(), 1);
        let child = &delta.child_deltas()[0];
        assert_eq!(child.kind(), DeltaKind::Changed);
        assert_eq!(child.association(), Some("children"));
        assert_eq!(child.changed_properties().len(), 1);
        let p = &child.changed_properties()[0];
        assert_eq!(p.name, "prop");
        assert_eq!(p.original, json!(0));
        assert_eq!(p.reference, json!(42));
    }

    #[test]
    fn swapped_children_are_moved() {
        let old = [obj("A"), obj("B")];
        let new = [obj("B"), obj("A")];
        let mut parent = ModelObjectDelta::empty();
        diff_children(&mut parent, &as_dyn(&old), &as_dyn(&new), "children", &DeltaOptions::default());

        let kinds: Vec<_> = parent.child_deltas().iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec![DeltaKind::Moved, DeltaKind::Moved]);
        let ids: Vec<_> = parent
            .child_deltas()
            .iter()
            .map(|d| d.reference_object().unwrap().property("id").unwrap())
            .collect();
        assert_eq!(ids, vec![json!("B"), json!("A")]);
    }

    #[test]
    fn swapped_children_ignored_when_moves_ignored() {
        let old = [obj("A"), obj("B")];
        let new = [obj("B"), obj("A")];
        let mut parent = ModelObjectDelta::empty();
        let options = DeltaOptions::default().with_ignore_moved(true);
        diff_children(&mut parent, &as_dyn(&old), &as_dyn(&new), "children", &options);
        assert!(parent.child_deltas().is_empty());
    }

    #[test]
    fn moved_child_still_records_changes() {
        let old = [obj("A").with_property("p", 1), obj("B")];
        let new = [obj("B"), obj("A").with_property("p", 2)];
        let mut parent = ModelObjectDelta::empty();
        diff_children(&mut parent, &as_dyn(&old), &as_dyn(&new), "c", &DeltaOptions::default());

        let a = &parent.child_deltas()[1];
        assert!(a.is_moved());
        assert_eq!(a.changed_properties().len(), 1);
    }

    #[test]
    fn insertion_moves_shifted_children() {
        let old = [obj("A"), obj("B")];
        let new = [obj("X"), obj("A"), obj("B")];
        let mut parent = ModelObjectDelta::empty();
        diff_children(&mut parent, &as_dyn(&old), &as_dyn(&new), "c", &DeltaOptions::default());

        let summary: Vec<_> = parent
            .child_deltas()
            .iter()
            .map(|d| (d.kind(), d.object().unwrap().property("id").unwrap()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (DeltaKind::Added, json!("X")),
                (DeltaKind::Moved, json!("A")),
                (DeltaKind::Moved, json!("B")),
            ]
        );
        assert!(parent.child_deltas()[1].changed_properties().is_empty());
    }

    #[test]
    fn removal_moves_shifted_children() {
        let old = [obj("R"), obj("A"), obj("B")];
        let new = [obj("A"), obj("B")];
        let mut parent = ModelObjectDelta::empty();
        diff_children(&mut parent, &as_dyn(&old), &as_dyn(&new), "c", &DeltaOptions::default());

        let kinds: Vec<_> = parent.child_deltas().iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec![DeltaKind::Moved, DeltaKind::Moved, DeltaKind::Removed]);

        let mut parent = ModelObjectDelta::empty();
        let options = DeltaOptions::default().with_ignore_moved(true);
        diff_children(&mut parent, &as_dyn(&old), &as_dyn(&new), "c", &options);
        let kinds: Vec<_> = parent.child_deltas().iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec![DeltaKind::Removed]);
    }

    #[test]
    fn additions_in_order_then_removals() {
        let old = [obj("A"), obj("R1"), obj("B"), obj("R2")];
        let new = [obj("N1"), obj("A").with_property("p", 1), obj("B"), obj("N2")];
        let mut parent = ModelObjectDelta::empty();
        diff_children(&mut parent, &as_dyn(&old), &as_dyn(&new), "c", &DeltaOptions::default());

        let summary: Vec<_> = parent
            .child_deltas()
            .iter()
            .map(|d| (d.kind(), d.object().unwrap().property("id").unwrap()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (DeltaKind::Added, json!("N1")),
                (DeltaKind::Moved, json!("A")),
                (DeltaKind::Added, json!("N2")),
                (DeltaKind::Removed, json!("R1")),
                (DeltaKind::Removed, json!("R2")),
            ]
        );
    }

    #[test]
    fn grandchild_changes_surface_under_unchanged_child() {
        let old = root().with_children("c", vec![obj("A").with_children("g", vec![obj("G").with_property("v", 1)])]);
        let new = root().with_children("c", vec![obj("A").with_children("g", vec![obj("G").with_property("v", 2)])]);
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());

        let child = &delta.child_deltas()[0];
        assert!(child.is_unchanged());
        assert!(child.has_changes());
        assert!(child.child_deltas()[0].is_changed());
        assert_eq!(delta.iter().count(), 3);
    }

    #[test]
    fn by_content_replaces_changed_elements() {
        let old = [obj("A").with_property("v", 1)];
        let new = [obj("A").with_property("v", 2)];
        let options = DeltaOptions::default().with_method("values", ComparisonMethod::ByContent);
        let mut parent = ModelObjectDelta::empty();
        diff_children(&mut parent, &as_dyn(&old), &as_dyn(&new), "values", &options);

        let kinds: Vec<_> = parent.child_deltas().iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec![DeltaKind::Added, DeltaKind::Removed]);
        assert!(parent.child_deltas().iter().all(|d| d.changed_properties().is_empty()));
    }

    #[test]
    fn to_one_child_replaced_when_not_same() {
        let old = obj("A");
        let new = obj("B");
        let mut parent = ModelObjectDelta::empty();
        diff_child(&mut parent, Some(&old), Some(&new), "main", &DeltaOptions::default());
        let kinds: Vec<_> = parent.child_deltas().iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec![DeltaKind::Added, DeltaKind::Removed]);
    }

    #[test]
    fn to_one_child_changed_in_place() {
        let old = root().with_child("main", obj("A").with_property("v", 1));
        let new = root().with_child("main", obj("A").with_property("v", 2));
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());
        assert_eq!(delta.child_deltas().len(), 1);
        assert!(delta.child_deltas()[0].is_changed());
    }

    #[test]
    fn association_missing_on_one_side() {
        let old = root();
        let new = root().with_children("c", vec![obj("A")]);
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());
        assert_eq!(delta.child_deltas().len(), 1);
        assert!(delta.child_deltas()[0].is_added());
    }

    #[test]
    fn ignore_associations_compares_properties_only() {
        let old = root().with_children("c", vec![obj("A")]);
        let new = root().with_children("c", vec![obj("B")]);
        let options = DeltaOptions::default().with_ignore_associations(true);
        assert!(diff_root(Some(&old), Some(&new), &options).is_empty());
    }

    // -----------------------------------------------------------------------
    // Subtree deltas
    // -----------------------------------------------------------------------

    #[test]
    fn added_subtree_lists_grandchildren() {
        let added_child = obj("added").with_children("grand", vec![obj("grandchild")]);
        let mut parent = ModelObjectDelta::empty();
        let options = DeltaOptions::default().with_subtree_delta(true);
        diff_child(&mut parent, None, Some(&added_child), "child", &options);

        let added = &parent.child_deltas()[0];
        assert!(added.is_added());
        assert_eq!(added.child_deltas().len(), 1);
        assert!(added.child_deltas()[0].is_added());
        assert_eq!(added.child_deltas()[0].association(), Some("grand"));
    }

    #[test]
    fn added_subtree_is_opaque_without_option() {
        let added_child = obj("added").with_children("grand", vec![obj("grandchild")]);
        let mut parent = ModelObjectDelta::empty();
        diff_child(&mut parent, None, Some(&added_child), "child", &DeltaOptions::default());

        let added = &parent.child_deltas()[0];
        assert!(added.is_added());
        assert!(added.child_deltas().is_empty());
    }

    #[test]
    fn removed_subtree_skips_references() {
        let removed = obj("gone")
            .with_children("owned", vec![obj("o1")])
            .with_reference("points_at", obj("elsewhere"));
        let options = DeltaOptions::default().with_subtree_delta(true);
        let delta = diff_root(Some(&removed), None, &options);

        assert!(delta.is_removed());
        assert_eq!(delta.child_deltas().len(), 1);
        assert!(delta.child_deltas()[0].is_removed());
        assert!(delta.child_deltas()[0].changed_properties().is_empty());
    }

    // -----------------------------------------------------------------------
    // Reference associations
    // -----------------------------------------------------------------------

    #[test]
    fn references_do_not_descend_into_targets() {
        let old = root().with_references("refs", vec![obj("A").with_property("v", 1)]);
        let new = root().with_references("refs", vec![obj("A").with_property("v", 2)]);
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());
        assert!(delta.is_empty());
    }

    #[test]
    fn references_track_add_remove_move() {
        let old = [obj("A"), obj("B"), obj("C")];
        let new = [obj("B"), obj("A"), obj("D")];
        let mut parent = ModelObjectDelta::empty();
        diff_associated(&mut parent, &as_dyn(&old), &as_dyn(&new), "refs", &DeltaOptions::default());

        let kinds: Vec<_> = parent.child_deltas().iter().map(|d| d.kind()).collect();
        assert_eq!(
            kinds,
            vec![DeltaKind::Moved, DeltaKind::Moved, DeltaKind::Added, DeltaKind::Removed]
        );
        assert!(parent.child_deltas().iter().all(|d| d.child_deltas().is_empty()));
    }

    #[test]
    fn to_one_reference_retargeted() {
        let (a, b) = (obj("A"), obj("B"));
        let mut parent = ModelObjectDelta::empty();
        diff_associated_child(&mut parent, Some(&a), Some(&b), "owner", &DeltaOptions::default());
        assert_eq!(parent.child_deltas().len(), 2);

        let mut parent = ModelObjectDelta::empty();
        diff_associated_child(&mut parent, Some(&a), Some(&a), "owner", &DeltaOptions::default());
        assert!(parent.child_deltas().is_empty());
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    #[test]
    fn display_renders_tree() {
        let old = root().with_children("c", vec![obj("A").with_property("p", 0)]);
        let new = root().with_children("c", vec![obj("A").with_property("p", 42)]);
        let delta = diff_root(Some(&old), Some(&new), &DeltaOptions::default());
        let text = delta.to_string();
        assert!(text.starts_with("unchanged Root"));
        assert!(text.contains("  changed TestObject via c [p: 0 -> 42]"));
    }
}

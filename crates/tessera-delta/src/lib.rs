//! Object graph delta engine.
//!
//! Compares two snapshots of the same logical object graph and produces a
//! tree of [`ModelObjectDelta`] nodes describing what was added, removed,
//! changed, or moved. The engine knows nothing about concrete domain types:
//! objects are seen through the [`DiffObject`] trait, and every policy
//! decision (identity matching, ignored properties, move detection, subtree
//! expansion) comes from a [`ComparisonOptions`] implementation.
//!
//! The engine is total. Values of incompatible kinds compare as unequal
//! instead of failing, so diffing never returns an error.
//!
//! # Key Types
//!
//! - [`DiffObject`] / [`Association`] / [`Targets`] -- the object graph view
//! - [`ComparisonOptions`] / [`DeltaOptions`] -- comparison policy
//! - [`ModelObjectDelta`] / [`DeltaKind`] / [`PropertyDelta`] -- the result tree
//! - [`ObjectNode`] -- a ready-made owned graph node for building projections

pub mod delta;
pub mod engine;
pub mod node;
pub mod object;
pub mod options;
pub mod value;

pub use delta::{DeltaIter, DeltaKind, ModelObjectDelta, PropertyDelta};
pub use engine::{diff_associated, diff_associated_child, diff_child, diff_children, diff_root};
pub use node::ObjectNode;
pub use object::{Association, AssociationKind, DiffObject, Targets};
pub use options::{ComparisonMethod, ComparisonOptions, DeltaOptions};
pub use value::{is_no_value, values_equal};

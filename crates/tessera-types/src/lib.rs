//! Foundation types for the Tessera runtime repository.
//!
//! This crate provides the identifier, classification, and temporal types
//! shared by every other Tessera crate.
//!
//! # Key Types
//!
//! - [`EntryId`] — Stable identifier of a manifest entry (component, generation, table, ...)
//! - [`EntryKind`] — Closed set of entry kinds a manifest may contain
//! - [`EffectiveDate`] — Millisecond-precision UTC instant used for generation validity

pub mod date;
pub mod error;
pub mod id;
pub mod kind;

pub use date::EffectiveDate;
pub use error::TypeError;
pub use id::EntryId;
pub use kind::EntryKind;

//! Table of contents for the Tessera runtime repository.
//!
//! A [`Manifest`] is the immutable index of every object a repository can
//! serve: which entries exist, what kind they are, how they are linked to
//! their parents, and where their serialized payload lives. The manifest is
//! parsed and validated once, when a repository is constructed; a manifest
//! that fails validation is rejected as a whole.
//!
//! # Modules
//!
//! - [`entry`] — [`ManifestEntry`] and [`PayloadLocator`]
//! - [`manifest`] — the validated, indexed [`Manifest`]
//! - [`source`] — [`ManifestSource`] implementations supplying manifest bytes
//! - [`error`] — [`ManifestError`]

pub mod entry;
pub mod error;
pub mod manifest;
pub mod source;

pub use entry::{ManifestEntry, PayloadLocator};
pub use error::{ManifestError, ManifestResult};
pub use manifest::{Manifest, FORMAT_VERSION};
pub use source::{BytesSource, FileSource, ManifestSource};

//! Error types for manifest parsing and validation.

use tessera_types::{EffectiveDate, EntryId, EntryKind};
use thiserror::Error;

/// Errors that can occur while loading a manifest.
///
/// Every variant except [`ManifestError::Io`] means the manifest is corrupt.
/// Corruption is fatal for repository construction.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A required field is missing or blank.
    #[error("manifest corrupt: entry {entry:?} is missing required field `{field}`")]
    MissingField { entry: String, field: &'static str },

    /// Two entries share the same id.
    #[error("manifest corrupt: duplicate entry id {0}")]
    DuplicateId(EntryId),

    /// An entry names a parent that does not exist.
    #[error("manifest corrupt: entry {entry} references missing parent {parent}")]
    BrokenParent { entry: EntryId, parent: EntryId },

    /// An entry's parent has the wrong kind.
    #[error("manifest corrupt: entry {entry} has parent {parent} of kind {parent_kind}")]
    InvalidParent {
        entry: EntryId,
        parent: EntryId,
        parent_kind: EntryKind,
    },

    /// Two generations of the same component share a `validFrom`.
    #[error("manifest corrupt: component {component} has two generations valid from {valid_from}")]
    DuplicateValidFrom {
        component: EntryId,
        valid_from: EffectiveDate,
    },

    /// Two components share the same `(kindId, versionId)` pair.
    #[error("manifest corrupt: duplicate component version {kind_id}/{version_id}")]
    DuplicateComponentVersion { kind_id: String, version_id: String },

    /// Two entries of a kind identified by qualified name share one.
    #[error("manifest corrupt: duplicate {kind} qualified name {name}")]
    DuplicateQualifiedName { kind: EntryKind, name: String },

    /// The manifest declares a format version this crate cannot read.
    #[error("manifest corrupt: unsupported format version {0}")]
    UnsupportedVersion(u32),

    /// The manifest bytes could not be parsed.
    #[error("manifest corrupt: {0}")]
    Parse(String),

    /// The manifest source could not be read.
    #[error("I/O error reading manifest: {0}")]
    Io(#[from] std::io::Error),
}

impl ManifestError {
    /// Returns `true` if the manifest content itself is invalid.
    pub fn is_corrupt(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Result alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

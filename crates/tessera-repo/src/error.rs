use tessera_manifest::ManifestError;
use tessera_types::{EffectiveDate, EntryId, EntryKind};

/// Errors from repository operations.
///
/// Ordinary absence is not an error: the `Option`-returning accessors
/// report it as `Ok(None)`. The `*NotFound` variants are raised only by the
/// `existing_*` accessors and always name the repository the lookup
/// started from.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The manifest could not be loaded or is corrupt.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A manifest entry could not be turned into a runtime object.
    #[error("failed to materialize {kind} {id}: {reason}")]
    Materialization {
        id: EntryId,
        kind: EntryKind,
        reason: String,
    },

    /// No repository in the chain holds the component.
    #[error("component {id} not found in repository {repository}")]
    ComponentNotFound { id: String, repository: String },

    /// The component exists but has no generation effective at `date`.
    #[error("component {component_id} has no generation effective at {date} (repository {repository})")]
    GenerationNotFound {
        component_id: String,
        date: EffectiveDate,
        repository: String,
    },

    #[error("table {name} not found in repository {repository}")]
    TableNotFound { name: String, repository: String },

    #[error("enum value {id} of type {value_type} not found in repository {repository}")]
    EnumValueNotFound {
        value_type: String,
        id: String,
        repository: String,
    },

    /// Two generations of one component share a `valid_from`.
    #[error("component {component_id} has two generations valid from {valid_from}")]
    DuplicateGeneration {
        component_id: EntryId,
        valid_from: EffectiveDate,
    },

    /// An enum value lookup service failed.
    #[error("lookup service for {value_type} failed: {reason}")]
    Lookup { value_type: String, reason: String },

    #[error("invalid repository configuration: {0}")]
    InvalidConfig(String),
}

impl RepoError {
    /// The error a failing [`EnumValueLookupService`](crate::EnumValueLookupService)
    /// reports for `value_type`.
    pub fn lookup(value_type: impl Into<String>, reason: impl ToString) -> Self {
        Self::Lookup {
            value_type: value_type.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for the errors raised by `existing_*` accessors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ComponentNotFound { .. }
                | Self::GenerationNotFound { .. }
                | Self::TableNotFound { .. }
                | Self::EnumValueNotFound { .. }
        )
    }
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

//! High-level SDK for Tessera.
//!
//! Builds repository chains from configuration, reloads them when their
//! manifests change, and projects components into snapshots the delta
//! engine can compare. This is the main entry point for applications
//! embedding Tessera.

pub mod chain;
pub mod config;
pub mod error;
pub mod manager;
pub mod snapshot;

#[cfg(test)]
mod testutil;

pub use chain::RepositoryChain;
pub use config::{ChainConfig, RepositoryEntry};
pub use error::{SdkError, SdkResult};
pub use manager::RepositoryManager;
pub use snapshot::{ComponentSnapshot, GenerationSnapshot, GENERATIONS};

// Re-export key types
pub use tessera_delta::{DeltaKind, DeltaOptions, ModelObjectDelta};
pub use tessera_repo::{Component, ComponentFilter, Generation, RepoError, Repository};
pub use tessera_types::{EffectiveDate, EntryId, EntryKind};

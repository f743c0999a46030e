//! Tessera runtime repository.
//!
//! Resolves typed business objects (components and their generations,
//! tables, enumerated values) from an immutable manifest, materializing each
//! one on first access and caching it for the lifetime of the repository.
//! Repositories form a delegation chain: a lookup that misses locally falls
//! through to the referenced repositories.
//!
//! # Key Types
//!
//! - [`Repository`] -- a node of the resolution chain and the client API
//! - [`RepositoryStore`] -- a single repository's own objects
//!   ([`ManifestStore`] for manifests, [`InMemoryStore`] for tests)
//! - [`Materializer`] / [`PayloadStore`] / [`PayloadReader`] -- lazy loading
//! - [`GenerationIndex`] -- effective-dated generation selection
//! - [`LookupServiceRegistry`] -- enumerated values from outside the manifest
//!
//! # Design Rules
//!
//! - Absence is `Ok(None)`; only `existing_*` accessors turn it into an error.
//! - A materialization failure is returned to the caller as is. The chain
//!   does not fall through to other repositories on errors.
//! - Materialized objects are immutable and shared as `Arc`s.

pub mod config;
pub mod error;
pub mod generation;
pub mod lookup;
pub mod manifest_store;
pub mod materializer;
pub mod memory;
pub mod model;
pub mod repository;
pub mod store;

pub use config::RepositoryConfig;
pub use error::{RepoError, RepoResult};
pub use generation::{GenerationIndex, GenerationRef};
pub use lookup::{EnumValueLookupService, LookupServiceRegistry, StaticLookupService};
pub use manifest_store::ManifestStore;
pub use materializer::{
    DirectoryPayloads, InMemoryPayloads, JsonPayloadReader, Materializer, PayloadReader,
    PayloadStore,
};
pub use memory::InMemoryStore;
pub use model::{
    Component, CustomObject, EnumContent, EnumValue, Generation, Properties, RuntimeObject, Table,
};
pub use repository::Repository;
pub use store::{ComponentFilter, RepositoryStore};

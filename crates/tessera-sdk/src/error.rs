use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown repository: {0}")]
    UnknownRepository(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest error: {0}")]
    Manifest(#[from] tessera_manifest::ManifestError),

    #[error("repository error: {0}")]
    Repo(#[from] tessera_repo::RepoError),
}

pub type SdkResult<T> = Result<T, SdkError>;

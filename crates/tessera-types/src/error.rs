use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("unknown entry kind: {0}")]
    UnknownKind(String),

    #[error("entry id must not be blank")]
    BlankId,
}

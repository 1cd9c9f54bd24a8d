use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("invalid repository url: {0}")]
    InvalidUrl(String),

    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("invalid bundle: {0}")]
    InvalidBundle(String),
}

pub type TypeResult<T> = Result<T, TypeError>;

use gbs_git::{Condition, GitError};
use gbs_types::{BundleFilter, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    /// No commits matched the filter.
    #[error("refusing to create empty bundle ({filter})")]
    Empty { filter: BundleFilter },

    #[error("malformed line in bundle head listing: {line:?}")]
    MalformedHead { line: String },

    #[error("invalid bundle: {0}")]
    Invalid(#[from] TypeError),

    #[error(transparent)]
    Git(#[from] GitError),
}

impl BundleError {
    /// Classification of the underlying git failure, if any.
    pub fn condition(&self) -> Condition {
        match self {
            Self::Empty { .. } => Condition::EmptyBundle,
            Self::Git(e) => e.condition(),
            _ => Condition::Other,
        }
    }
}

impl From<std::io::Error> for BundleError {
    fn from(e: std::io::Error) -> Self {
        Self::Git(GitError::Io(e))
    }
}

pub type BundleResult<T> = Result<T, BundleError>;

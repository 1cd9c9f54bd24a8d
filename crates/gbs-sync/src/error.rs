use std::fmt;

use gbs_bundle::BundleError;
use gbs_git::{Condition, GitError};
use thiserror::Error;

use crate::outcome::SyncOutcome;

pub(crate) const CONFLICT_MESSAGE: &str = "failed to apply bundle, some prerequisites are missing. \
     You must provide a bundle that overlaps with commits in the remote repository";

/// Step of a push or pull at which an error happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    SyncingMirror,
    CheckingBranch,
    CheckingCommits,
    CreatingBundle,
    ReceivingBundle,
    VerifyingBundle,
    ListingHeads,
    ApplyingBundle,
    PushingRemote,
}

impl Stage {
    /// What the caller is told when the step fails for an unrecognized
    /// reason.
    fn failure_message(self) -> &'static str {
        match self {
            Self::SyncingMirror => "failed to sync repository",
            Self::CheckingBranch => "failed to check branch",
            Self::CheckingCommits => "failed to check commits",
            Self::CreatingBundle => "failed to create bundle",
            Self::ReceivingBundle => "failed to receive bundle",
            Self::VerifyingBundle => "failed to verify bundle",
            Self::ListingHeads => "failed to get bundle info",
            Self::ApplyingBundle => "failed to apply bundle",
            Self::PushingRemote => "failed to push to remote repository",
        }
    }

    /// Failures at this step may have left the mirror inconsistent.
    fn taints_mirror(self) -> bool {
        matches!(self, Self::SyncingMirror | Self::ApplyingBundle)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SyncingMirror => "syncing mirror",
            Self::CheckingBranch => "checking branch",
            Self::CheckingCommits => "checking commits",
            Self::CreatingBundle => "creating bundle",
            Self::ReceivingBundle => "receiving bundle",
            Self::VerifyingBundle => "verifying bundle",
            Self::ListingHeads => "listing heads",
            Self::ApplyingBundle => "applying bundle",
            Self::PushingRemote => "pushing remote",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid request: {0}")]
    BadInput(String),

    #[error("remote repository does not exist")]
    RemoteMissing,

    /// Nothing to export; becomes `NoContent`.
    #[error("nothing to export: {0}")]
    NothingToExport(String),

    #[error("bundle must carry exactly one head, found {0}")]
    HeadCount(usize),

    #[error("{stage} failed: {source}")]
    Git {
        stage: Stage,
        #[source]
        source: GitError,
    },

    #[error("{stage} failed: {source}")]
    Bundle {
        stage: Stage,
        #[source]
        source: BundleError,
    },
}

impl SyncError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Git { stage, .. } | Self::Bundle { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Classification of the underlying git failure.
    pub fn condition(&self) -> Condition {
        match self {
            Self::Git { source, .. } => source.condition(),
            Self::Bundle { source, .. } => source.condition(),
            _ => Condition::Other,
        }
    }

    /// Whether the mirror should be rebuilt from scratch before next use.
    ///
    /// Only unrecognized failures while syncing or applying qualify; a
    /// conflict or an auth failure says nothing about the mirror's health.
    pub fn taints_mirror(&self) -> bool {
        self.condition() == Condition::Other && self.stage().is_some_and(Stage::taints_mirror)
    }

    /// The caller-facing outcome for this error.
    pub fn into_outcome<T>(self) -> SyncOutcome<T> {
        match self {
            Self::BadInput(m) => SyncOutcome::BadInput(m),
            Self::RemoteMissing => SyncOutcome::NotFound("remote repository does not exist".into()),
            Self::NothingToExport(reason) => SyncOutcome::NoContent(reason),
            Self::HeadCount(_) => SyncOutcome::InternalError("failed to get bundle info".into()),
            other => match other.condition() {
                Condition::AuthFailed => {
                    SyncOutcome::AuthFailed("remote repository rejected the credentials".into())
                }
                Condition::RemoteNotFound => {
                    SyncOutcome::NotFound("remote repository does not exist".into())
                }
                Condition::MissingPrerequisites => SyncOutcome::Conflict(CONFLICT_MESSAGE.into()),
                Condition::EmptyBundle => SyncOutcome::NoContent("no new commits".into()),
                Condition::RemoteRefMissing | Condition::Other => SyncOutcome::InternalError(
                    other.stage().map_or("internal error", Stage::failure_message).into(),
                ),
            },
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Attach the step to a lower-level failure.
pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> SyncResult<T>;
}

impl<T> AtStage<T> for Result<T, GitError> {
    fn at(self, stage: Stage) -> SyncResult<T> {
        self.map_err(|source| SyncError::Git { stage, source })
    }
}

impl<T> AtStage<T> for Result<T, BundleError> {
    fn at(self, stage: Stage) -> SyncResult<T> {
        self.map_err(|source| SyncError::Bundle { stage, source })
    }
}

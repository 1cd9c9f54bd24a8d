use std::fmt;

use gbs_types::{BundleFilter, Head};
use serde::{Deserialize, Serialize};

/// Result of a push or pull.
///
/// Every variant but `Success` carries a short explanation that is safe to
/// return to the caller. Diagnostic detail is logged, never carried here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome<T> {
    Success(T),
    /// Legitimately nothing to return.
    NoContent(String),
    NotFound(String),
    AuthFailed(String),
    /// The bundle's prerequisites are not in the mirror.
    Conflict(String),
    BadInput(String),
    InternalError(String),
}

/// The class of a [`SyncOutcome`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    NoContent,
    NotFound,
    AuthFailed,
    Conflict,
    BadInput,
    InternalError,
}

impl OutcomeKind {
    /// Whether the outcome counts as a failed operation.
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Success | Self::NoContent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoContent => "no_content",
            Self::NotFound => "not_found",
            Self::AuthFailed => "auth_failed",
            Self::Conflict => "conflict",
            Self::BadInput => "bad_input",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> SyncOutcome<T> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::NoContent(_) => OutcomeKind::NoContent,
            Self::NotFound(_) => OutcomeKind::NotFound,
            Self::AuthFailed(_) => OutcomeKind::AuthFailed,
            Self::Conflict(_) => OutcomeKind::Conflict,
            Self::BadInput(_) => OutcomeKind::BadInput,
            Self::InternalError(_) => OutcomeKind::InternalError,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The explanation of a non-success outcome.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::NoContent(m)
            | Self::NotFound(m)
            | Self::AuthFailed(m)
            | Self::Conflict(m)
            | Self::BadInput(m)
            | Self::InternalError(m) => Some(m),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SyncOutcome<U> {
        match self {
            Self::Success(v) => SyncOutcome::Success(f(v)),
            Self::NoContent(m) => SyncOutcome::NoContent(m),
            Self::NotFound(m) => SyncOutcome::NotFound(m),
            Self::AuthFailed(m) => SyncOutcome::AuthFailed(m),
            Self::Conflict(m) => SyncOutcome::Conflict(m),
            Self::BadInput(m) => SyncOutcome::BadInput(m),
            Self::InternalError(m) => SyncOutcome::InternalError(m),
        }
    }
}

/// Confirmation of a successful push.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReceipt {
    /// Tip of the pushed branch.
    pub head: Option<String>,
    pub bytes_received: u64,
}

/// A bundle produced by a pull, with the metadata callers receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PulledBundle {
    pub bytes: Vec<u8>,
    /// The single head the bundle carries.
    pub head: Head,
    /// A `since` or `after` filter was requested, whatever the bundle holds.
    pub is_partial: bool,
    /// The filter the hash was computed over: the requested one, or `None`
    /// when the bundle turned out complete anyway.
    pub effective_filter: BundleFilter,
    pub idempotency_hash: String,
}

impl PulledBundle {
    /// Attachment file name, e.g. `git_<commit>_<hash>.bundle`.
    pub fn file_name(&self) -> String {
        format!("git_{}_{}.bundle", self.head.commit_id, self.idempotency_hash)
    }
}

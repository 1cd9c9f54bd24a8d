use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::format_duration;
use crate::error::{TypeError, TypeResult};

/// Optional time bound applied when a bundle is created.
///
/// `since` and `after` are alternatives: when both are set, `since` wins
/// and `after` is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleOptions {
    /// Lookback window relative to the moment the bundle is created.
    pub since: Option<Duration>,
    /// Absolute cutoff; only commits after this instant are included.
    pub after: Option<DateTime<Utc>>,
}

impl BundleOptions {
    pub fn since(window: Duration) -> Self {
        Self { since: Some(window), after: None }
    }

    pub fn after(cutoff: DateTime<Utc>) -> Self {
        Self { since: None, after: Some(cutoff) }
    }

    /// The single filter that is actually applied.
    pub fn filter(&self) -> BundleFilter {
        match (self.since, self.after) {
            (Some(window), _) if !window.is_zero() => BundleFilter::Since(window),
            (_, Some(cutoff)) => BundleFilter::After(cutoff),
            _ => BundleFilter::None,
        }
    }

    pub fn has_any(&self) -> bool {
        !self.filter().is_none()
    }
}

/// The effective filter of a bundle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleFilter {
    None,
    Since(Duration),
    After(DateTime<Utc>),
}

impl BundleFilter {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Stable name of the filter kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Since(_) => "since",
            Self::After(_) => "after",
        }
    }

    /// Stable textual rendering of the filter value (empty for `None`).
    pub fn value(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Since(window) => format!("{}s", window.as_secs()),
            Self::After(cutoff) => cutoff.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// The instant before which commits are excluded, given the current time.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::None => None,
            Self::Since(window) => chrono::Duration::from_std(*window)
                .ok()
                .and_then(|w| now.checked_sub_signed(w)),
            Self::After(cutoff) => Some(*cutoff),
        }
    }
}

impl fmt::Display for BundleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Since(window) => write!(f, "since {}", format_duration(*window)),
            Self::After(cutoff) => write!(f, "after {}", cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

/// Parsed integrity report of a bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    /// The bundle has no prerequisites.
    pub is_complete: bool,
    /// The single reference the bundle carries, as `<commit> <ref>`.
    pub contains_ref: String,
    /// The prerequisite the bundle needs; empty for complete bundles.
    pub requires_ref: String,
    pub hash_algorithm: String,
    /// The integrity check reported the bundle as okay.
    pub is_well_formed: bool,
}

impl BundleInfo {
    /// A bundle is usable when it is well formed, carries a reference, and is
    /// either complete or declares its prerequisite.
    pub fn validate(&self) -> TypeResult<()> {
        if !self.is_well_formed {
            return Err(TypeError::InvalidBundle("bundle is not okay".into()));
        }
        if self.contains_ref.is_empty() {
            return Err(TypeError::InvalidBundle("bundle does not contain a ref".into()));
        }
        if !self.is_complete && self.requires_ref.is_empty() {
            return Err(TypeError::InvalidBundle(
                "bundle is partial but does not declare its prerequisite".into(),
            ));
        }
        Ok(())
    }
}

/// One reference contained in a bundle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Head {
    pub commit_id: String,
    pub ref_name: String,
}

impl Head {
    pub fn new(commit_id: impl Into<String>, ref_name: impl Into<String>) -> Self {
        Self { commit_id: commit_id.into(), ref_name: ref_name.into() }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.commit_id, self.ref_name)
    }
}

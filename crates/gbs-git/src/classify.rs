//! Classification of failed git invocations.
//!
//! git reports why it failed only through human-readable stderr. All the
//! text matching lives here, in a [`MarkerTable`] tied to the diagnostic
//! wording of a git release line, so callers only ever see a [`Condition`].
//! Commands are run with `LC_ALL=C`, which keeps the wording untranslated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A recognized reason for a git failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    /// The remote rejected the credential, or one was required and missing.
    AuthFailed,
    /// The remote repository does not exist.
    RemoteNotFound,
    /// The remote exists but does not have the requested branch.
    RemoteRefMissing,
    /// A partial bundle's prerequisite commits are absent from the mirror.
    MissingPrerequisites,
    /// Bundle creation would have produced a bundle without commits.
    EmptyBundle,
    /// Anything else.
    Other,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AuthFailed => "auth-failed",
            Self::RemoteNotFound => "remote-not-found",
            Self::RemoteRefMissing => "remote-ref-missing",
            Self::MissingPrerequisites => "missing-prerequisites",
            Self::EmptyBundle => "empty-bundle",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// One matching rule: every needle must occur in the lowercased stderr.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub condition: Condition,
    pub needles: Vec<String>,
}

impl Marker {
    pub fn new(condition: Condition, needles: &[&str]) -> Self {
        Self {
            condition,
            needles: needles.iter().map(|n| n.to_lowercase()).collect(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        !self.needles.is_empty() && self.needles.iter().all(|n| haystack.contains(n.as_str()))
    }
}

/// Ordered set of markers; the first matching marker wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerTable {
    /// The git release line whose wording the markers were taken from.
    pub version: String,
    pub markers: Vec<Marker>,
}

impl MarkerTable {
    /// Markers for the diagnostics of git 2.x.
    pub fn git_v2() -> Self {
        use Condition::*;
        Self {
            version: "git-2".into(),
            markers: vec![
                Marker::new(MissingPrerequisites, &["lacks these prerequisite commits"]),
                Marker::new(EmptyBundle, &["refusing to create empty bundle"]),
                Marker::new(AuthFailed, &["authentication failed"]),
                Marker::new(AuthFailed, &["could not read username"]),
                Marker::new(AuthFailed, &["could not read password"]),
                Marker::new(AuthFailed, &["terminal prompts disabled"]),
                Marker::new(AuthFailed, &["access denied"]),
                Marker::new(AuthFailed, &["returned error: 401"]),
                Marker::new(AuthFailed, &["returned error: 403"]),
                Marker::new(RemoteNotFound, &["repository not found"]),
                Marker::new(RemoteNotFound, &["repository '", "' not found"]),
                Marker::new(RemoteNotFound, &["does not appear to be a git repository"]),
                Marker::new(RemoteNotFound, &["returned error: 404"]),
                Marker::new(RemoteRefMissing, &["couldn't find remote ref"]),
                Marker::new(RemoteRefMissing, &["not found in upstream"]),
            ],
        }
    }

    /// Append a marker; it is consulted after the existing ones.
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::git_v2()
    }
}

/// Turns git stderr into a [`Condition`].
#[derive(Clone, Debug, Default)]
pub struct Classifier {
    table: MarkerTable,
}

impl Classifier {
    pub fn new(table: MarkerTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &MarkerTable {
        &self.table
    }

    pub fn classify(&self, stderr: &str) -> Condition {
        let haystack = stderr.to_lowercase();
        self.table
            .markers
            .iter()
            .find(|m| m.matches(&haystack))
            .map(|m| m.condition)
            .unwrap_or(Condition::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(stderr: &str) -> Condition {
        Classifier::default().classify(stderr)
    }

    #[test]
    fn missing_prerequisites() {
        let stderr = "error: Repository lacks these prerequisite commits:\n\
                      error: 3a1f0c7d2b Second commit\n";
        assert_eq!(classify(stderr), Condition::MissingPrerequisites);
    }

    #[test]
    fn empty_bundle() {
        assert_eq!(classify("fatal: Refusing to create empty bundle.\n"), Condition::EmptyBundle);
    }

    #[test]
    fn auth_failures() {
        for stderr in [
            "remote: Invalid username or password.\nfatal: Authentication failed for 'https://h/r.git/'",
            "fatal: could not read Username for 'https://h': terminal prompts disabled",
            "fatal: unable to access 'https://h/r.git/': The requested URL returned error: 403",
            "remote: HTTP Basic: Access denied",
        ] {
            assert_eq!(classify(stderr), Condition::AuthFailed, "{stderr}");
        }
    }

    #[test]
    fn remote_not_found() {
        for stderr in [
            "remote: Repository not found.\nfatal: repository 'https://h/r.git/' not found",
            "fatal: '/srv/missing.git' does not appear to be a git repository\nfatal: Could not read from remote repository.",
            "fatal: unable to access 'https://h/r.git/': The requested URL returned error: 404",
        ] {
            assert_eq!(classify(stderr), Condition::RemoteNotFound, "{stderr}");
        }
    }

    #[test]
    fn remote_ref_missing() {
        assert_eq!(classify("fatal: couldn't find remote ref main"), Condition::RemoteRefMissing);
        assert_eq!(
            classify("fatal: Remote branch main not found in upstream origin"),
            Condition::RemoteRefMissing
        );
    }

    #[test]
    fn unknown_is_other() {
        assert_eq!(classify("fatal: something unexpected happened"), Condition::Other);
        assert_eq!(classify(""), Condition::Other);
    }

    #[test]
    fn all_needles_must_match() {
        assert_eq!(classify("fatal: repository is corrupt"), Condition::Other);
    }

    #[test]
    fn custom_marker_is_consulted() {
        let table = MarkerTable::git_v2()
            .with_marker(Marker::new(Condition::AuthFailed, &["Zugriff verweigert"]));
        let c = Classifier::new(table);
        assert_eq!(c.classify("fatal: Zugriff verweigert"), Condition::AuthFailed);
        assert_eq!(c.table().version, "git-2");
    }

    #[test]
    fn condition_display() {
        assert_eq!(Condition::MissingPrerequisites.to_string(), "missing-prerequisites");
        assert_eq!(Condition::Other.to_string(), "other");
    }
}

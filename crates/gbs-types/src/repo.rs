use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::names::validate_branch_name;

/// One logical sync endpoint: a remote repository URL, the single branch
/// synchronized with it, and the credential presented to the remote.
///
/// An empty `access_token` means the remote is accessed anonymously.
/// The token is redacted from the `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepoRef {
    pub url: String,
    pub branch: String,
    #[serde(default, skip_serializing)]
    pub access_token: String,
}

impl RemoteRepoRef {
    pub fn new(
        url: impl Into<String>,
        branch: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            branch: branch.into(),
            access_token: access_token.into(),
        }
    }

    /// Reference without a credential.
    pub fn anonymous(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::new(url, branch, String::new())
    }

    /// Check that the reference can safely be handed to `git`.
    pub fn validate(&self) -> TypeResult<()> {
        if self.url.trim().is_empty() {
            return Err(TypeError::InvalidUrl("repository url must not be empty".into()));
        }
        if self.url.starts_with('-') {
            return Err(TypeError::InvalidUrl(format!(
                "repository url must not start with '-': {}",
                self.url
            )));
        }
        if self.url.chars().any(char::is_control) {
            return Err(TypeError::InvalidUrl(
                "repository url must not contain control characters".into(),
            ));
        }
        validate_branch_name(&self.branch)
    }

    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Fully qualified name of the tracked branch, e.g. `refs/heads/main`.
    pub fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    /// Same endpoint with a different credential.
    pub fn with_token(&self, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for RemoteRepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteRepoRef")
            .field("url", &self.url)
            .field("branch", &self.branch)
            .field("access_token", &if self.has_token() { "<redacted>" } else { "" })
            .finish()
    }
}

impl fmt::Display for RemoteRepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.url, self.branch)
    }
}

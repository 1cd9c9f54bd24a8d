//! Git process plumbing for git-bundle-sync.
//!
//! Every interaction with version-control storage goes through the `git`
//! binary. This crate owns how those invocations are issued and how their
//! failures are interpreted.
//!
//! # Architecture
//!
//! - **GitRunner**: spawns `git` with a timeout, kill-on-drop, a fixed locale,
//!   and credentials passed through the environment
//! - **Classifier**: maps a failed invocation's stderr to a [`Condition`]
//!   using a versioned [`MarkerTable`]
//! - **LocalMirror**: the per-`(url, branch)` working copy: existence check,
//!   clone-or-pull, orphan initialization, branch/commit checks, push
//! - **ScratchFile**: received payloads persisted under the scratch root and
//!   removed when dropped

pub mod classify;
pub mod command;
pub mod config;
pub mod error;
pub mod mirror;
pub mod scratch;

pub use classify::{Classifier, Condition, Marker, MarkerTable};
pub use command::{CommandOutput, GitCommand, GitRunner};
pub use config::GitConfig;
pub use error::{CommandError, GitError, GitResult};
pub use mirror::{LocalMirror, MirrorState, REMOTE_NAME};
pub use scratch::ScratchFile;

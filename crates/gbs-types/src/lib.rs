//! Foundation types for git-bundle-sync.
//!
//! Every other crate in the workspace depends on `gbs-types`.
//!
//! # Key Types
//!
//! - [`RemoteRepoRef`]: one logical sync endpoint (remote URL, branch, access token)
//! - [`BundleOptions`] / [`BundleFilter`]: optional time bound applied when creating a bundle
//! - [`BundleInfo`]: parsed integrity report of a bundle
//! - [`Head`]: one reference contained in a bundle

pub mod bundle;
pub mod duration;
pub mod error;
pub mod names;
pub mod repo;

pub use bundle::{BundleFilter, BundleInfo, BundleOptions, Head};
pub use duration::{format_duration, parse_duration};
pub use error::{TypeError, TypeResult};
pub use names::validate_branch_name;
pub use repo::RemoteRepoRef;

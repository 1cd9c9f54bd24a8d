use std::path::{Path, PathBuf};

use crate::hasher::ContentHasher;

/// Directory name of the mirror for a `(url, branch)` pair.
///
/// The name is the hex digest of both fields, so it is filesystem safe for
/// any input and distinct branches of the same URL never share a mirror.
pub fn mirror_dir_name(url: &str, branch: &str) -> String {
    ContentHasher::WORKDIR.hash_hex(&[url, branch])
}

/// Resolve the mirror directory for a `(url, branch)` pair under `root`.
///
/// Pure and deterministic; touches nothing on disk.
pub fn resolve_workdir(root: &Path, url: &str, branch: &str) -> PathBuf {
    root.join(mirror_dir_name(url, branch))
}

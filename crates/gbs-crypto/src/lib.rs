//! Hashing primitives for git-bundle-sync.
//!
//! - [`ContentHasher`]: domain-separated BLAKE3 hashing of framed fields
//! - [`resolve_workdir`]: deterministic mirror directory for a `(url, branch)` pair
//! - [`idempotency_hash`]: digest callers use to recognize an unchanged pull

pub mod hasher;
pub mod idempotency;
pub mod workdir;

pub use hasher::ContentHasher;
pub use idempotency::idempotency_hash;
pub use workdir::{mirror_dir_name, resolve_workdir};

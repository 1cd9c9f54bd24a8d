//! Bundle codec for git-bundle-sync.
//!
//! A bundle is git's file representation of a range of history. This crate
//! creates bundles from a mirror, reads back what git reports about them,
//! and applies received bundles.
//!
//! # Architecture
//!
//! - **BundleCodec**: create / verify / list-heads / apply against one mirror
//! - **parse**: pure parsers for `git bundle verify` and `git bundle list-heads`
//!   output

pub mod codec;
pub mod error;
pub mod parse;

pub use codec::BundleCodec;
pub use error::{BundleError, BundleResult};
pub use parse::{parse_list_heads_output, parse_verify_output};

//! Parsers for the text git prints about bundles.
//!
//! Both parsers expect the C locale wording that [`gbs_git::GitRunner`]
//! enforces.

use gbs_types::{BundleInfo, Head};

use crate::error::{BundleError, BundleResult};

const BUNDLE_PREFIX: &str = "The bundle ";
const COMPLETE_HISTORY: &str = "The bundle records a complete history.";
const HASH_ALGORITHM: &str = "The bundle uses this hash algorithm: ";
const OKAY_SUFFIX: &str = " is okay";

#[derive(Clone, Copy)]
enum RefList {
    Contains,
    Requires,
}

/// Match `The bundle contains this ref:` and its plural form
/// `The bundle contains these 2 refs:`, likewise for `requires`.
fn ref_list_header(line: &str) -> Option<RefList> {
    let rest = line.strip_prefix(BUNDLE_PREFIX)?;
    let (list, rest) = if let Some(rest) = rest.strip_prefix("contains ") {
        (RefList::Contains, rest)
    } else if let Some(rest) = rest.strip_prefix("requires ") {
        (RefList::Requires, rest)
    } else {
        return None;
    };
    let plural = rest
        .strip_prefix("these ")
        .and_then(|r| r.strip_suffix(" refs:"))
        .is_some_and(|n| n.parse::<u64>().is_ok());
    (rest == "this ref:" || plural).then_some(list)
}

/// A line that cannot belong to a ref list.
fn ends_ref_list(line: &str) -> bool {
    line.is_empty() || line.starts_with(BUNDLE_PREFIX) || line.ends_with(OKAY_SUFFIX)
}

/// Parse the report of `git bundle verify`.
///
/// The contained and required refs are announced by a header line and
/// printed one per line after it, up to the next `The bundle` line. Several
/// refs are kept newline separated. git splits the report between stdout
/// and stderr, so pass both streams.
pub fn parse_verify_output(output: &str) -> BundleInfo {
    let mut info = BundleInfo::default();
    let mut lines = output.lines().map(str::trim).peekable();
    while let Some(line) = lines.next() {
        if let Some(list) = ref_list_header(line) {
            let mut refs = Vec::new();
            while let Some(r) = lines.next_if(|l| !ends_ref_list(l)) {
                refs.push(r);
            }
            let refs = refs.join("\n");
            match list {
                RefList::Contains => info.contains_ref = refs,
                RefList::Requires => info.requires_ref = refs,
            }
        } else if line.starts_with(COMPLETE_HISTORY) {
            info.is_complete = true;
        } else if let Some(algo) = line.strip_prefix(HASH_ALGORITHM) {
            info.hash_algorithm = algo.to_string();
        } else if line.ends_with(OKAY_SUFFIX) {
            info.is_well_formed = true;
        }
    }
    info
}

/// Parse the output of `git bundle list-heads`: one `<commit> <ref>` per
/// line. Any other shape is an error.
pub fn parse_list_heads_output(output: &str) -> BundleResult<Vec<Head>> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(commit), Some(name), None) => Ok(Head::new(commit, name)),
                _ => Err(BundleError::MalformedHead { line: line.to_string() }),
            }
        })
        .collect()
}

use gbs_types::BundleFilter;

use crate::hasher::ContentHasher;

/// Idempotency hash of a pulled bundle: a hex digest over the head commit
/// and the filter that shaped the bundle.
///
/// Callers compare it across pulls to detect that the logical content has
/// not changed. Pass the *effective* filter: a filter that still produced a
/// complete history should be given as [`BundleFilter::None`].
pub fn idempotency_hash(commit_id: &str, filter: &BundleFilter) -> String {
    ContentHasher::IDEMPOTENCY.hash_hex(&[commit_id, filter.kind(), &filter.value()])
}

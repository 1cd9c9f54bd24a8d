use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use gbs_bundle::{BundleCodec, BundleError};
use gbs_crypto::idempotency_hash;
use gbs_git::{LocalMirror, MirrorState, ScratchFile};
use gbs_types::{BundleFilter, BundleOptions, Head};

use crate::error::{AtStage, Stage, SyncError, SyncResult};
use crate::outcome::PulledBundle;

/// Exports the tracked branch of a mirror as a bundle.
///
/// Steps: sync the mirror, check that the branch exists and has a commit,
/// create the bundle, verify it and read its single head, hash. An absent
/// branch, an unborn branch and a filter that matches nothing all end in
/// [`SyncError::NothingToExport`]. The caller holds the mirror's lease.
pub struct PullOrchestrator<'a> {
    mirror: &'a LocalMirror,
    codec: BundleCodec,
    scratch_root: PathBuf,
}

impl<'a> PullOrchestrator<'a> {
    pub fn new(mirror: &'a LocalMirror, scratch_root: impl Into<PathBuf>) -> Self {
        let scratch_root = scratch_root.into();
        Self {
            mirror,
            codec: BundleCodec::for_mirror(mirror, scratch_root.clone()),
            scratch_root,
        }
    }

    pub async fn run(&self, options: &BundleOptions) -> SyncResult<PulledBundle> {
        if self.mirror.sync_to_local().await.at(Stage::SyncingMirror)? == MirrorState::RemoteMissing {
            return Err(SyncError::RemoteMissing);
        }
        if !self.mirror.has_local_branch().await.at(Stage::CheckingBranch)? {
            return Err(SyncError::NothingToExport("branch not found".into()));
        }
        if !self.mirror.has_local_commits().await.at(Stage::CheckingCommits)? {
            return Err(SyncError::NothingToExport("no commits".into()));
        }

        let filter = options.filter();
        let bytes = match self.codec.create_bundle(options).await {
            Ok(bytes) => bytes,
            Err(BundleError::Empty { filter }) => {
                return Err(SyncError::NothingToExport(empty_reason(&filter, Utc::now())));
            }
            Err(e) => return Err(e).at(Stage::CreatingBundle),
        };

        let scratch = ScratchFile::from_bytes(&self.scratch_root, &bytes)
            .await
            .at(Stage::CreatingBundle)?;
        let info = self.codec.verify_file(scratch.path()).await.at(Stage::VerifyingBundle)?;
        let heads = self.codec.list_heads_file(scratch.path()).await.at(Stage::ListingHeads)?;
        let head = single_head(heads)?;

        // A filter that still reached the root exports the same content as
        // no filter at all, so it hashes like one. It is still reported as
        // partial: the caller asked for a window.
        let is_partial = !filter.is_none();
        let effective_filter = if info.is_complete { BundleFilter::None } else { filter };
        let idempotency_hash = idempotency_hash(&head.commit_id, &effective_filter);
        tracing::debug!(head = %head, %effective_filter, is_partial, hash = %idempotency_hash, "bundle created");

        Ok(PulledBundle {
            bytes,
            head,
            is_partial,
            effective_filter,
            idempotency_hash,
        })
    }
}

/// The only head of a single-branch bundle.
pub fn single_head(heads: Vec<Head>) -> SyncResult<Head> {
    let count = heads.len();
    let mut heads = heads.into_iter();
    match (heads.next(), heads.next()) {
        (Some(head), None) => Ok(head),
        _ => Err(SyncError::HeadCount(count)),
    }
}

fn empty_reason(filter: &BundleFilter, now: DateTime<Utc>) -> String {
    match filter.cutoff(now) {
        Some(cutoff) => format!(
            "no new commits since {}",
            cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        None => "no new commits".into(),
    }
}

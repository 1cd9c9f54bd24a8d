use std::path::PathBuf;

use gbs_bundle::BundleCodec;
use gbs_git::{LocalMirror, MirrorState, ScratchFile};
use tokio::io::AsyncRead;

use crate::error::{AtStage, Stage, SyncError, SyncResult};
use crate::outcome::PushReceipt;

/// Imports a received bundle into a mirror and forwards it to the remote.
///
/// Steps: sync the mirror, persist and verify the bundle, fast-forward the
/// branch from it, push. Re-sending a bundle that is already applied is a
/// successful no-op. The caller holds the mirror's lease.
pub struct PushOrchestrator<'a> {
    mirror: &'a LocalMirror,
    codec: BundleCodec,
    scratch_root: PathBuf,
}

impl<'a> PushOrchestrator<'a> {
    pub fn new(mirror: &'a LocalMirror, scratch_root: impl Into<PathBuf>) -> Self {
        let scratch_root = scratch_root.into();
        Self {
            mirror,
            codec: BundleCodec::for_mirror(mirror, scratch_root.clone()),
            scratch_root,
        }
    }

    pub async fn run<R>(&self, body: &mut R) -> SyncResult<PushReceipt>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if self.mirror.sync_to_local().await.at(Stage::SyncingMirror)? == MirrorState::RemoteMissing {
            return Err(SyncError::RemoteMissing);
        }

        let (scratch, bytes_received) = ScratchFile::from_reader(&self.scratch_root, body)
            .await
            .at(Stage::ReceivingBundle)?;
        if bytes_received == 0 {
            return Err(SyncError::BadInput("request body must contain a bundle".into()));
        }

        let info = self.codec.verify_file(scratch.path()).await.at(Stage::VerifyingBundle)?;
        tracing::debug!(
            contains = %info.contains_ref,
            complete = info.is_complete,
            bytes = bytes_received,
            "bundle verified"
        );

        self.codec.apply_file(scratch.path()).await.at(Stage::ApplyingBundle)?;
        drop(scratch);

        self.mirror.push_to_remote().await.at(Stage::PushingRemote)?;
        let head = self.mirror.tip_commit().await.at(Stage::PushingRemote)?;
        Ok(PushReceipt { head, bytes_received })
    }
}

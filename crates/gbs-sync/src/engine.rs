use std::path::{Path, PathBuf};
use std::sync::Arc;

use gbs_git::{GitError, GitRunner, LocalMirror};
use gbs_types::{BundleOptions, RemoteRepoRef};
use tokio::io::AsyncRead;

use crate::error::{AtStage, Stage, SyncError, SyncResult};
use crate::metrics::{MetricsSink, NoopMetrics, Operation};
use crate::outcome::{OutcomeKind, PulledBundle, PushReceipt, SyncOutcome};
use crate::pull::PullOrchestrator;
use crate::push::PushOrchestrator;
use crate::registry::{MirrorLease, MirrorRegistry};

const MIRRORS_DIR: &str = "mirrors";
const SCRATCH_DIR: &str = "scratch";

/// Entry point for push and pull.
///
/// All mirrors and scratch files live under `root`. Each operation holds the
/// lease of its mirror from first to last git invocation, records one
/// metrics sample, and returns a [`SyncOutcome`] whose messages are safe to
/// show to remote callers.
#[derive(Clone)]
pub struct SyncEngine {
    root: PathBuf,
    runner: GitRunner,
    registry: Arc<MirrorRegistry>,
    metrics: Arc<dyn MetricsSink>,
}

impl SyncEngine {
    pub fn new(root: impl Into<PathBuf>, runner: GitRunner) -> Self {
        Self {
            root: root.into(),
            runner,
            registry: Arc::new(MirrorRegistry::new()),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mirror_root(&self) -> PathBuf {
        self.root.join(MIRRORS_DIR)
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    pub fn registry(&self) -> &MirrorRegistry {
        &self.registry
    }

    /// The mirror for `repo`, without touching the filesystem.
    pub fn mirror(&self, repo: RemoteRepoRef) -> SyncResult<LocalMirror> {
        LocalMirror::new(&self.mirror_root(), repo, self.runner.clone()).map_err(|e| match e {
            GitError::InvalidRepo(reason) => SyncError::BadInput(reason.to_string()),
            other => SyncError::BadInput(other.to_string()),
        })
    }

    /// Apply the bundle read from `body` to the mirror of `repo` and push
    /// the result to the remote.
    #[tracing::instrument(skip_all, fields(op = "push", repo.url = %repo.url, repo.branch = %repo.branch))]
    pub async fn push<R>(&self, repo: RemoteRepoRef, body: &mut R) -> SyncOutcome<PushReceipt>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let url = repo.url.clone();
        let result = self.push_inner(repo, body).await;
        self.finish(Operation::Push, &url, result)
    }

    /// Export the tracked branch of `repo`, filtered by `options`.
    #[tracing::instrument(skip_all, fields(op = "pull", repo.url = %repo.url, repo.branch = %repo.branch))]
    pub async fn pull(&self, repo: RemoteRepoRef, options: &BundleOptions) -> SyncOutcome<PulledBundle> {
        let url = repo.url.clone();
        let result = self.pull_inner(repo, options).await;
        self.finish(Operation::Pull, &url, result)
    }

    async fn push_inner<R>(&self, repo: RemoteRepoRef, body: &mut R) -> SyncResult<PushReceipt>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let mirror = self.mirror(repo)?;
        let _lease = self.lease(&mirror).await?;
        let result = PushOrchestrator::new(&mirror, self.scratch_root()).run(body).await;
        self.inspect_failure(&mirror, &result);
        result
    }

    async fn pull_inner(&self, repo: RemoteRepoRef, options: &BundleOptions) -> SyncResult<PulledBundle> {
        let mirror = self.mirror(repo)?;
        let _lease = self.lease(&mirror).await?;
        let result = PullOrchestrator::new(&mirror, self.scratch_root()).run(options).await;
        self.inspect_failure(&mirror, &result);
        result
    }

    /// Take the mirror's lease, discarding the mirror first if it is suspect.
    async fn lease(&self, mirror: &LocalMirror) -> SyncResult<MirrorLease> {
        let lease = self.registry.lease(mirror.workdir()).await;
        if self.registry.take_suspect(mirror.workdir()) {
            tracing::info!(workdir = %mirror.workdir().display(), "rebuilding suspect mirror");
            if let Err(e) = mirror.discard().await.at(Stage::SyncingMirror) {
                self.registry.mark_suspect(mirror.workdir());
                return Err(e);
            }
        }
        Ok(lease)
    }

    fn inspect_failure<T>(&self, mirror: &LocalMirror, result: &SyncResult<T>) {
        if let Err(e) = result {
            if e.taints_mirror() {
                self.registry.mark_suspect(mirror.workdir());
            }
        }
    }

    fn finish<T>(&self, op: Operation, url: &str, result: SyncResult<T>) -> SyncOutcome<T> {
        let outcome = match result {
            Ok(value) => SyncOutcome::Success(value),
            Err(e) => e.into_outcome_logged(),
        };
        let kind = outcome.kind();
        match kind {
            OutcomeKind::Success => tracing::info!("{op} succeeded"),
            OutcomeKind::NoContent => {
                tracing::info!(reason = outcome.message().unwrap_or_default(), "{op} had nothing to export")
            }
            _ => {}
        }
        self.metrics.record(op, url, kind);
        outcome
    }
}

impl SyncError {
    /// Log the full error chain for operators, then reduce it to an outcome.
    fn into_outcome_logged<T>(self) -> SyncOutcome<T> {
        match &self {
            SyncError::NothingToExport(_) => {}
            SyncError::BadInput(m) => tracing::warn!(reason = %m, "rejected request"),
            SyncError::RemoteMissing => tracing::info!("remote repository does not exist"),
            e => tracing::error!(
                error = %e,
                stage = ?e.stage(),
                condition = %e.condition(),
                "operation failed"
            ),
        }
        self.into_outcome()
    }
}

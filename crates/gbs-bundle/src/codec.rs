use std::path::{Path, PathBuf};

use gbs_git::{Condition, GitCommand, GitRunner, LocalMirror, ScratchFile};
use gbs_types::{BundleFilter, BundleInfo, BundleOptions, Head};
use tokio::io::AsyncRead;

use crate::error::{BundleError, BundleResult};
use crate::parse::{parse_list_heads_output, parse_verify_output};

/// Cutoff format accepted by `git rev-list --after`.
const AFTER_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Creates, inspects, and applies bundles for one tracked branch.
///
/// Every git invocation runs inside `workdir`. Payloads handed over as
/// bytes or streams are persisted to a [`ScratchFile`] under `scratch_root`
/// first, because git reads bundles from seekable files.
#[derive(Clone, Debug)]
pub struct BundleCodec {
    runner: GitRunner,
    workdir: PathBuf,
    branch: String,
    scratch_root: PathBuf,
}

impl BundleCodec {
    pub fn new(
        runner: GitRunner,
        workdir: impl Into<PathBuf>,
        branch: impl Into<String>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            workdir: workdir.into(),
            branch: branch.into(),
            scratch_root: scratch_root.into(),
        }
    }

    /// Codec operating on `mirror`'s tracked branch.
    pub fn for_mirror(mirror: &LocalMirror, scratch_root: impl Into<PathBuf>) -> Self {
        Self::new(
            mirror.runner().clone(),
            mirror.workdir(),
            mirror.repo().branch.clone(),
            scratch_root,
        )
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    fn command(&self, subcommand: &str) -> GitCommand {
        GitCommand::new(subcommand).current_dir(&self.workdir)
    }

    /// Bundle the tracked branch, restricted by the filter of `options`.
    ///
    /// A filter that matches no commits yields [`BundleError::Empty`].
    pub async fn create_bundle(&self, options: &BundleOptions) -> BundleResult<Vec<u8>> {
        let filter = options.filter();
        let mut cmd = self.command("bundle").args(["create", "--quiet", "-"]);
        match filter {
            BundleFilter::None => {}
            BundleFilter::Since(window) => {
                cmd = cmd.arg(format!("--since={}.seconds.ago", window.as_secs()));
            }
            BundleFilter::After(cutoff) => {
                cmd = cmd.arg(format!("--after={}", cutoff.format(AFTER_FORMAT)));
            }
        }
        let cmd = cmd.arg(self.branch_ref()).describe(format!("failed to bundle branch {}", self.branch));

        match self.runner.run(cmd).await {
            Ok(out) => {
                tracing::debug!(branch = %self.branch, %filter, bytes = out.stdout.len(), "created bundle");
                Ok(out.stdout)
            }
            Err(e) if e.is(Condition::EmptyBundle) => Err(BundleError::Empty { filter }),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify a bundle against the repository and parse git's report.
    ///
    /// The report is validated; a bundle whose prerequisites are missing
    /// fails with [`Condition::MissingPrerequisites`].
    pub async fn verify_bundle(&self, bundle: &[u8]) -> BundleResult<BundleInfo> {
        let scratch = ScratchFile::from_bytes(&self.scratch_root, bundle).await?;
        self.verify_file(scratch.path()).await
    }

    pub async fn verify_file(&self, path: &Path) -> BundleResult<BundleInfo> {
        let cmd = self
            .command("bundle")
            .arg("verify")
            .arg(path)
            .describe("failed to verify bundle");
        let out = self.runner.run(cmd).await?;
        let report = format!("{}\n{}", out.stdout_str(), out.stderr);
        let info = parse_verify_output(&report);
        info.validate()?;
        Ok(info)
    }

    /// The references a bundle carries.
    pub async fn list_heads(&self, bundle: &[u8]) -> BundleResult<Vec<Head>> {
        let scratch = ScratchFile::from_bytes(&self.scratch_root, bundle).await?;
        self.list_heads_file(scratch.path()).await
    }

    pub async fn list_heads_file(&self, path: &Path) -> BundleResult<Vec<Head>> {
        let cmd = self
            .command("bundle")
            .arg("list-heads")
            .arg(path)
            .describe("failed to list bundle heads");
        let out = self.runner.run(cmd).await?;
        parse_list_heads_output(&out.stdout_str())
    }

    /// Fast-forward the tracked branch from a bundle stream. Returns the
    /// number of bytes received.
    ///
    /// The scratch copy is removed whether or not the apply succeeds.
    pub async fn apply_bundle<R>(&self, reader: &mut R) -> BundleResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let (scratch, size) = ScratchFile::from_reader(&self.scratch_root, reader).await?;
        self.apply_file(scratch.path()).await?;
        Ok(size)
    }

    pub async fn apply_file(&self, path: &Path) -> BundleResult<()> {
        let cmd = self
            .command("pull")
            .args(["--ff-only", "--quiet"])
            .arg(path)
            .arg(&self.branch)
            .describe(format!("failed to apply bundle to branch {}", self.branch));
        self.runner.run(cmd).await?;
        tracing::debug!(branch = %self.branch, "applied bundle");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gbs_types::RemoteRepoRef;
    use std::process::Command;
    use std::time::Duration;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().map(|o| o.status.success()).unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let out = Command::new("git")
            .args(["-c", "user.name=gbs", "-c", "user.email=gbs@localhost"])
            .args(args)
            .current_dir(dir)
            .env("LC_ALL", "C")
            .env("GIT_AUTHOR_DATE", "2001-01-01T00:00:00Z")
            .env("GIT_COMMITTER_DATE", "2001-01-01T00:00:00Z")
            .output()
            .unwrap();
        assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    /// A repository on `main` with two commits dated 2001.
    fn seeded_repo(dir: &Path) -> String {
        std::fs::create_dir_all(dir).unwrap();
        git(dir, &["init", "--quiet"]);
        git(dir, &["checkout", "--quiet", "-b", "main"]);
        for n in ["one", "two"] {
            std::fs::write(dir.join(n), n).unwrap();
            git(dir, &["add", n]);
            git(dir, &["commit", "--quiet", "-m", n]);
        }
        git(dir, &["rev-parse", "refs/heads/main"])
    }

    fn codec(workdir: &Path, scratch: &Path) -> BundleCodec {
        BundleCodec::new(GitRunner::default(), workdir, "main", scratch)
    }

    #[tokio::test]
    async fn create_verify_and_list() {
        if !git_available() {
            return;
        }
        let base = tempfile::tempdir().unwrap();
        let repo = base.path().join("repo");
        let tip = seeded_repo(&repo);
        let c = codec(&repo, &base.path().join("scratch"));

        let bundle = c.create_bundle(&BundleOptions::default()).await.unwrap();
        assert!(!bundle.is_empty());

        let info = c.verify_bundle(&bundle).await.unwrap();
        assert!(info.is_complete);
        assert!(info.contains_ref.starts_with(&tip));

        let heads = c.list_heads(&bundle).await.unwrap();
        assert_eq!(heads, vec![Head::new(tip, "refs/heads/main")]);
    }

    #[tokio::test]
    async fn filter_newer_than_history_is_empty() {
        if !git_available() {
            return;
        }
        let base = tempfile::tempdir().unwrap();
        let repo = base.path().join("repo");
        seeded_repo(&repo);
        let c = codec(&repo, &base.path().join("scratch"));

        let err = c.create_bundle(&BundleOptions::since(Duration::from_secs(3600))).await.unwrap_err();
        assert!(matches!(err, BundleError::Empty { .. }));
        assert_eq!(err.condition(), Condition::EmptyBundle);

        let cutoff = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let err = c.create_bundle(&BundleOptions::after(cutoff)).await.unwrap_err();
        assert!(matches!(err, BundleError::Empty { .. }));
    }

    #[tokio::test]
    async fn apply_into_orphan_mirror() {
        if !git_available() {
            return;
        }
        let base = tempfile::tempdir().unwrap();
        let repo = base.path().join("repo");
        let tip = seeded_repo(&repo);
        let scratch = base.path().join("scratch");
        let bundle = codec(&repo, &scratch).create_bundle(&BundleOptions::default()).await.unwrap();

        let remote = base.path().join("sink.git");
        std::fs::create_dir_all(&remote).unwrap();
        git(&remote, &["init", "--quiet", "--bare"]);
        let mirror = LocalMirror::new(
            &base.path().join("mirrors"),
            RemoteRepoRef::anonymous(remote.to_str().unwrap(), "main"),
            GitRunner::default(),
        )
        .unwrap();
        mirror.sync_to_local().await.unwrap();

        let c = BundleCodec::for_mirror(&mirror, &scratch);
        let mut reader: &[u8] = &bundle;
        let size = c.apply_bundle(&mut reader).await.unwrap();
        assert_eq!(size, bundle.len() as u64);
        assert_eq!(mirror.tip_commit().await.unwrap(), Some(tip));

        // Applying the same bundle again is a no-op.
        let mut reader: &[u8] = &bundle;
        c.apply_bundle(&mut reader).await.unwrap();

        // Scratch copies are gone.
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn partial_bundle_needs_prerequisites() {
        if !git_available() {
            return;
        }
        let base = tempfile::tempdir().unwrap();
        let repo = base.path().join("repo");
        seeded_repo(&repo);
        let scratch = base.path().join("scratch");
        let source = codec(&repo, &scratch);

        // Only the second commit.
        let partial = {
            let cmd = GitCommand::new("bundle")
                .args(["create", "--quiet", "-", "refs/heads/main~1..refs/heads/main"])
                .current_dir(&repo);
            GitRunner::default().run(cmd).await.unwrap().stdout
        };
        let info = source.verify_bundle(&partial).await.unwrap();
        assert!(!info.is_complete);
        assert!(!info.requires_ref.is_empty());

        let empty = base.path().join("empty");
        std::fs::create_dir_all(&empty).unwrap();
        git(&empty, &["init", "--quiet"]);
        let err = codec(&empty, &scratch).verify_bundle(&partial).await.unwrap_err();
        assert_eq!(err.condition(), Condition::MissingPrerequisites);
    }
}

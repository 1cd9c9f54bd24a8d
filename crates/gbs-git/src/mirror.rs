use std::path::{Path, PathBuf};

use gbs_crypto::resolve_workdir;
use gbs_types::RemoteRepoRef;

use crate::classify::Condition;
use crate::command::{GitCommand, GitRunner};
use crate::error::{GitError, GitResult};

/// Name under which the remote is registered in every mirror.
pub const REMOTE_NAME: &str = "origin";

/// State of a mirror after a successful sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorState {
    /// The mirror exists and reflects the remote branch (which may be unborn).
    Ready,
    /// The remote repository does not exist. Not an error.
    RemoteMissing,
}

/// The local working copy kept for one `(url, branch)` pair.
///
/// A mirror tracks exactly one branch. It is created by the first sync,
/// either by a single-branch clone or, when the remote has no such branch,
/// by orphan initialization, and refreshed by every sync after that.
/// Callers serialize access per workdir; see `gbs_sync::MirrorRegistry`.
#[derive(Clone, Debug)]
pub struct LocalMirror {
    repo: RemoteRepoRef,
    workdir: PathBuf,
    runner: GitRunner,
}

impl LocalMirror {
    /// Mirror for `repo` under `root`. Fails if the reference cannot safely be
    /// passed to git.
    pub fn new(root: &Path, repo: RemoteRepoRef, runner: GitRunner) -> GitResult<Self> {
        repo.validate()?;
        let workdir = resolve_workdir(root, &repo.url, &repo.branch);
        Ok(Self { repo, workdir, runner })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn repo(&self) -> &RemoteRepoRef {
        &self.repo
    }

    pub fn runner(&self) -> &GitRunner {
        &self.runner
    }

    /// A git command that runs inside the mirror.
    pub fn command(&self, subcommand: &str) -> GitCommand {
        GitCommand::new(subcommand).current_dir(&self.workdir)
    }

    /// A git command that runs inside the mirror and talks to the remote.
    fn remote_command(&self, subcommand: &str) -> GitCommand {
        self.command(subcommand).credential(&self.repo.access_token)
    }

    /// Whether a repository is initialized at the workdir.
    pub async fn exists_locally(&self) -> bool {
        let marker = self.workdir.join(".git");
        if !tokio::fs::try_exists(&marker).await.unwrap_or(false) {
            return false;
        }
        match self.runner.run_unchecked(self.command("rev-parse").arg("--git-dir")).await {
            Ok(out) => out.success(),
            Err(e) => {
                tracing::debug!(workdir = %self.workdir.display(), error = %e, "mirror check failed");
                false
            }
        }
    }

    /// Bring the mirror up to date with the remote branch, creating it first
    /// if needed.
    ///
    /// Clone versus pull is decided by local presence only. Authentication
    /// failures surface as errors with [`Condition::AuthFailed`].
    #[tracing::instrument(skip(self), fields(repo.url = %self.repo.url, repo.branch = %self.repo.branch))]
    pub async fn sync_to_local(&self) -> GitResult<MirrorState> {
        if self.exists_locally().await {
            self.pull().await
        } else {
            self.clone_remote().await
        }
    }

    async fn clone_remote(&self) -> GitResult<MirrorState> {
        if tokio::fs::try_exists(&self.workdir).await? {
            tracing::warn!(workdir = %self.workdir.display(), "removing directory that is not a repository");
            tokio::fs::remove_dir_all(&self.workdir).await?;
        }
        if let Some(parent) = self.workdir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let ls_remote = GitCommand::new("ls-remote")
            .args(["--heads", "--exit-code"])
            .arg(&self.repo.url)
            .arg(self.repo.branch_ref())
            .credential(&self.repo.access_token)
            .describe("failed to list remote branches");
        let out = self.runner.run_unchecked(ls_remote.clone()).await?;
        match out.exit_code {
            0 => {}
            // --exit-code: the remote is reachable but has no matching ref.
            2 => return self.init_orphan().await.map(|()| MirrorState::Ready),
            _ => {
                let err = self.runner.failure(&ls_remote, out);
                if err.is(Condition::RemoteNotFound) {
                    tracing::info!("remote repository not found");
                    return Ok(MirrorState::RemoteMissing);
                }
                return Err(err);
            }
        }

        let clone = GitCommand::new("clone")
            .args(["--quiet", "--single-branch", "--branch"])
            .arg(&self.repo.branch)
            .args(["--origin", REMOTE_NAME, "--"])
            .arg(&self.repo.url)
            .arg(&self.workdir)
            .credential(&self.repo.access_token)
            .describe("failed to clone remote repository");
        match self.runner.run(clone).await {
            Ok(_) => {
                tracing::info!(workdir = %self.workdir.display(), "cloned mirror");
                Ok(MirrorState::Ready)
            }
            Err(err) => {
                self.discard().await?;
                match err.condition() {
                    // The branch disappeared between ls-remote and the clone.
                    Condition::RemoteRefMissing => self.init_orphan().await.map(|()| MirrorState::Ready),
                    Condition::RemoteNotFound => Ok(MirrorState::RemoteMissing),
                    _ => Err(err),
                }
            }
        }
    }

    /// Create an empty repository whose HEAD points at the not yet existing
    /// tracked branch.
    ///
    /// Order matters: branch configuration first, then the symbolic HEAD.
    /// No checkout happens; the worktree is populated by the first applied
    /// bundle or pull.
    pub async fn init_orphan(&self) -> GitResult<()> {
        let branch = &self.repo.branch;
        self.runner
            .run(
                GitCommand::new("init")
                    .arg("--quiet")
                    .arg(&self.workdir)
                    .describe("failed to initialize mirror"),
            )
            .await?;
        self.runner
            .run(
                self.command("remote")
                    .args(["add", REMOTE_NAME])
                    .arg(&self.repo.url)
                    .describe("failed to register remote"),
            )
            .await?;
        self.runner
            .run(
                self.command("config")
                    .arg(format!("branch.{branch}.remote"))
                    .arg(REMOTE_NAME)
                    .describe("failed to configure branch remote"),
            )
            .await?;
        self.runner
            .run(
                self.command("config")
                    .arg(format!("branch.{branch}.merge"))
                    .arg(self.repo.branch_ref())
                    .describe("failed to configure branch merge"),
            )
            .await?;
        self.runner
            .run(
                self.command("symbolic-ref")
                    .arg("HEAD")
                    .arg(self.repo.branch_ref())
                    .describe("failed to point HEAD at branch"),
            )
            .await?;
        tracing::info!(workdir = %self.workdir.display(), "initialized orphan mirror");
        Ok(())
    }

    /// Fast-forward the mirror to the remote branch.
    ///
    /// "Already up to date" and a remote that still lacks the branch are both
    /// [`MirrorState::Ready`].
    pub async fn pull(&self) -> GitResult<MirrorState> {
        let cmd = self
            .remote_command("pull")
            .args(["--ff-only", "--quiet", REMOTE_NAME])
            .arg(&self.repo.branch)
            .describe("failed to pull from remote");
        match self.runner.run(cmd).await {
            Ok(_) => Ok(MirrorState::Ready),
            Err(err) => match err.condition() {
                Condition::RemoteRefMissing => {
                    tracing::debug!("remote branch does not exist yet");
                    Ok(MirrorState::Ready)
                }
                Condition::RemoteNotFound => Ok(MirrorState::RemoteMissing),
                _ => Err(err),
            },
        }
    }

    /// Whether the tracked branch exists locally, either as a reference or as
    /// the configured branch of an orphan mirror.
    pub async fn has_local_branch(&self) -> GitResult<bool> {
        let config = self
            .command("config")
            .arg("--get")
            .arg(format!("branch.{}.merge", self.repo.branch))
            .describe("failed to read branch configuration");
        if self.check(config).await? {
            return Ok(true);
        }
        let show_ref = self
            .command("show-ref")
            .args(["--verify", "--quiet"])
            .arg(self.repo.branch_ref())
            .describe("failed to look up branch reference");
        self.check(show_ref).await
    }

    /// Whether the tracked branch resolves to a commit.
    pub async fn has_local_commits(&self) -> GitResult<bool> {
        let cmd = self
            .command("rev-parse")
            .args(["--verify", "--quiet"])
            .arg(format!("{}^{{commit}}", self.repo.branch_ref()))
            .describe("failed to resolve branch commit");
        self.check(cmd).await
    }

    /// Commit the tracked branch points at, if any.
    pub async fn tip_commit(&self) -> GitResult<Option<String>> {
        let cmd = self
            .command("rev-parse")
            .args(["--verify", "--quiet"])
            .arg(format!("{}^{{commit}}", self.repo.branch_ref()))
            .describe("failed to resolve branch commit");
        let out = self.runner.run_unchecked(cmd.clone()).await?;
        match out.exit_code {
            0 => Ok(Some(out.stdout_str().trim().to_string())),
            1 => Ok(None),
            _ => Err(self.runner.failure(&cmd, out)),
        }
    }

    /// Push the tracked branch to the remote. "Everything up-to-date" is
    /// success.
    pub async fn push_to_remote(&self) -> GitResult<()> {
        let refspec = format!("{0}:{0}", self.repo.branch_ref());
        let cmd = self
            .remote_command("push")
            .args(["--quiet", REMOTE_NAME])
            .arg(refspec)
            .describe("failed to push to remote");
        self.runner.run(cmd).await?;
        tracing::info!(repo.url = %self.repo.url, repo.branch = %self.repo.branch, "pushed mirror");
        Ok(())
    }

    /// Remove the mirror from disk. A missing workdir is not an error.
    pub async fn discard(&self) -> GitResult<()> {
        match tokio::fs::remove_dir_all(&self.workdir).await {
            Ok(()) => {
                tracing::debug!(workdir = %self.workdir.display(), "discarded mirror");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GitError::Io(e)),
        }
    }

    /// Exit 0 is true, exit 1 is false, anything else is a failure.
    async fn check(&self, cmd: GitCommand) -> GitResult<bool> {
        let out = self.runner.run_unchecked(cmd.clone()).await?;
        match out.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            _ => Err(self.runner.failure(&cmd, out)),
        }
    }
}

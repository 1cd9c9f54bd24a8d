//! Throwaway repositories for driving the engine against real git.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use gbs_git::GitRunner;
use gbs_sync::SyncEngine;
use tempfile::TempDir;

pub const OLD_DATE: &str = "2001-01-01T00:00:00Z";

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, optionally pinning author and committer dates.
pub fn git(dir: &Path, args: &[&str], date: Option<&str>) -> String {
    let mut cmd = Command::new("git");
    cmd.args(["-c", "user.name=gbs", "-c", "user.email=gbs@localhost"])
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C");
    if let Some(date) = date {
        cmd.env("GIT_AUTHOR_DATE", date).env("GIT_COMMITTER_DATE", date);
    }
    let out = cmd.output().unwrap();
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.path().join("engine"), GitRunner::default())
    }

    /// An empty bare repository; returns its URL.
    pub fn bare(&self, name: &str) -> String {
        let path = self.path().join("remotes").join(name);
        std::fs::create_dir_all(&path).unwrap();
        git(&path, &["init", "--quiet", "--bare"], None);
        path.to_string_lossy().into_owned()
    }

    /// A URL nothing exists at.
    pub fn missing(&self, name: &str) -> String {
        self.path().join("remotes").join(name).to_string_lossy().into_owned()
    }

    /// A non-bare working repository on `main` without commits.
    pub fn work(&self, name: &str) -> Work {
        let dir = self.path().join("work").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        git(&dir, &["init", "--quiet"], None);
        git(&dir, &["symbolic-ref", "HEAD", "refs/heads/main"], None);
        Work { dir }
    }
}

pub struct Work {
    pub dir: PathBuf,
}

impl Work {
    /// Commit a new file on the checked-out branch; returns the new commit.
    pub fn commit(&self, name: &str, date: Option<&str>) -> String {
        std::fs::write(self.dir.join(name), name).unwrap();
        git(&self.dir, &["add", name], None);
        git(&self.dir, &["commit", "--quiet", "-m", name], date);
        git(&self.dir, &["rev-parse", "HEAD"], None)
    }

    /// Create `branch` at `start` and check it out.
    pub fn branch(&self, branch: &str, start: &str) {
        git(&self.dir, &["checkout", "--quiet", "-b", branch, start], None);
    }

    pub fn checkout(&self, branch: &str) {
        git(&self.dir, &["checkout", "--quiet", branch], None);
    }

    /// Merge `branch` into the checked-out branch with a merge commit;
    /// returns the merge.
    pub fn merge(&self, branch: &str, date: Option<&str>) -> String {
        let message = format!("merge {branch}");
        git(&self.dir, &["merge", "--quiet", "--no-ff", "-m", message.as_str(), branch], date);
        git(&self.dir, &["rev-parse", "HEAD"], None)
    }

    pub fn tip(&self) -> String {
        git(&self.dir, &["rev-parse", "refs/heads/main"], None)
    }

    pub fn push_to(&self, url: &str) {
        git(&self.dir, &["push", "--quiet", url, "main:main"], None);
    }

    /// Bundle of `revs` (e.g. `main` or `main~1..main`).
    pub fn bundle(&self, revs: &str) -> Vec<u8> {
        let file = self.dir.join(".git").join("test.bundle");
        let file_arg = file.to_string_lossy().into_owned();
        git(&self.dir, &["bundle", "create", "--quiet", &file_arg, revs], None);
        std::fs::read(&file).unwrap()
    }
}

/// Tip of `main` in a bare repository.
pub fn remote_tip(url: &str) -> String {
    git(Path::new(url), &["rev-parse", "refs/heads/main"], None)
}

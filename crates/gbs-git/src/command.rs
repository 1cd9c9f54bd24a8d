use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::process::Command;

use crate::classify::{Classifier, Condition};
use crate::config::GitConfig;
use crate::error::{CommandError, GitError, GitResult};

/// Username sent alongside token credentials; hosts ignore it but git's
/// basic auth requires one.
const TOKEN_USERNAME: &str = "not_used";

/// One git invocation.
///
/// ```
/// use gbs_git::GitCommand;
///
/// let cmd = GitCommand::new("bundle")
///     .arg("list-heads")
///     .arg("/tmp/payload.bundle")
///     .describe("failed to list bundle heads");
/// assert_eq!(cmd.display(), "git bundle list-heads /tmp/payload.bundle");
/// ```
#[derive(Clone, Debug)]
pub struct GitCommand {
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    token: Option<String>,
    message: String,
}

impl GitCommand {
    pub fn new(subcommand: impl AsRef<OsStr>) -> Self {
        Self {
            args: vec![subcommand.as_ref().to_os_string()],
            cwd: None,
            token: None,
            message: String::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Present `token` to the remote as HTTP basic credentials. Empty tokens
    /// are ignored.
    pub fn credential(mut self, token: &str) -> Self {
        if !token.is_empty() {
            self.token = Some(token.to_string());
        }
        self
    }

    /// Human-readable description used when the command fails.
    pub fn describe(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The command line as it would be logged. Never contains credentials.
    pub fn display(&self) -> String {
        let mut out = String::from("git");
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }

    fn message(&self) -> String {
        if self.message.is_empty() {
            format!("`{}` failed", self.display())
        } else {
            self.message.clone()
        }
    }
}

/// Output of a finished git process.
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Spawns git processes.
///
/// Every process gets `LC_ALL=C` so diagnostics stay in the wording the
/// [`Classifier`] knows, `GIT_TERMINAL_PROMPT=0` so a missing credential
/// fails instead of blocking, and `kill_on_drop` so that a cancelled caller
/// or an expired timeout terminates the child.
#[derive(Clone, Debug)]
pub struct GitRunner {
    program: PathBuf,
    timeout: Duration,
    classifier: Arc<Classifier>,
}

impl GitRunner {
    pub fn new(config: &GitConfig, classifier: Classifier) -> Self {
        Self {
            program: PathBuf::from(&config.program),
            timeout: config.command_timeout(),
            classifier: Arc::new(classifier),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Run and require exit status 0; any other status becomes a classified
    /// [`GitError::Failed`].
    pub async fn run(&self, cmd: GitCommand) -> GitResult<CommandOutput> {
        let output = self.output(&cmd).await?;
        if output.success() {
            return Ok(output);
        }
        Err(self.failure(&cmd, output))
    }

    /// Run and return the output whatever the exit status. Fails only when
    /// the process cannot be spawned or times out.
    pub async fn run_unchecked(&self, cmd: GitCommand) -> GitResult<CommandOutput> {
        self.output(&cmd).await
    }

    /// Classify a finished process's output as a failure of `cmd`.
    pub fn failure(&self, cmd: &GitCommand, output: CommandOutput) -> GitError {
        let condition = self.classifier.classify(&output.stderr);
        tracing::debug!(
            command = %cmd.display(),
            exit_code = output.exit_code,
            %condition,
            "git command failed"
        );
        GitError::Failed {
            condition,
            source: CommandError::new(cmd.message(), cmd.display(), output.exit_code, output.stderr),
        }
    }

    async fn output(&self, cmd: &GitCommand) -> GitResult<CommandOutput> {
        let mut command = Command::new(&self.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }
        if let Some(token) = &cmd.token {
            let basic = STANDARD.encode(format!("{TOKEN_USERNAME}:{token}"));
            command
                .env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env("GIT_CONFIG_VALUE_0", format!("Authorization: Basic {basic}"));
        }

        tracing::trace!(command = %cmd.display(), cwd = ?cmd.cwd, "running git");

        let child = command.spawn().map_err(|e| GitError::Failed {
            condition: Condition::Other,
            source: CommandError::spawn_failed(cmd.message(), cmd.display(), e),
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(command = %cmd.display(), timeout = ?self.timeout, "git command timed out");
                return Err(GitError::Timeout {
                    command: cmd.display(),
                    timeout: self.timeout,
                });
            }
        };

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new(&GitConfig::default(), Classifier::default())
    }
}

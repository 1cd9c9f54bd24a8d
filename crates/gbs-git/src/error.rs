use std::time::Duration;

use thiserror::Error;

use crate::classify::Condition;

/// Detailed record of a failed external-process invocation.
///
/// `command` never contains credentials; they are passed to git through the
/// environment. `exit_code` is `-1` when the process could not be spawned or
/// was terminated by a signal.
#[derive(Debug, Error)]
#[error("command error '{message}': `{command}` (status: {exit_code}, stderr: {})", .stderr.trim())]
pub struct CommandError {
    pub message: String,
    pub command: String,
    pub exit_code: i32,
    pub stderr: String,
    #[source]
    pub source: Option<std::io::Error>,
}

impl CommandError {
    pub fn new(
        message: impl Into<String>,
        command: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
            source: None,
        }
    }

    /// Record of a process that could not be started at all.
    pub fn spawn_failed(message: impl Into<String>, command: impl Into<String>, err: std::io::Error) -> Self {
        Self {
            message: message.into(),
            command: command.into(),
            exit_code: -1,
            stderr: String::new(),
            source: Some(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum GitError {
    /// git failed or could not be started; `condition` is the classification
    /// of its stderr.
    #[error("{source}")]
    Failed {
        condition: Condition,
        #[source]
        source: CommandError,
    },

    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// git succeeded but printed something this crate cannot interpret.
    #[error("unexpected git output: {0}")]
    UnexpectedOutput(String),

    #[error("invalid repository reference: {0}")]
    InvalidRepo(#[from] gbs_types::TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// The recognized condition behind this error; anything that is not a
    /// classified git failure is [`Condition::Other`].
    pub fn condition(&self) -> Condition {
        match self {
            Self::Failed { condition, .. } => *condition,
            _ => Condition::Other,
        }
    }

    pub fn is(&self, condition: Condition) -> bool {
        self.condition() == condition
    }

    /// The underlying command failure, if git ran at all.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            Self::Failed { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.command_error().map(|e| e.exit_code)
    }
}

pub type GitResult<T> = Result<T, GitError>;

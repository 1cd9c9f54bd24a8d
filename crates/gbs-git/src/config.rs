use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the `git` binary is invoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Program name or path of the git binary.
    pub program: String,
    /// Wall-clock limit for a single invocation; the process is killed when exceeded.
    pub command_timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".into(),
            command_timeout_secs: 300,
        }
    }
}

impl GitConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GitConfig::default();
        assert_eq!(c.program, "git");
        assert_eq!(c.command_timeout(), Duration::from_secs(300));
    }
}

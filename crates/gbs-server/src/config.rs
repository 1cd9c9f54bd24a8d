use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gbs_git::GitConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
    8185,
);

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root of all mirrors and scratch files.
    pub scratch_dir: PathBuf,
    /// Remote exported by `GET /pull/*branch`.
    pub source_repo: Option<String>,
    /// Remote fed by `POST /push/*branch`.
    pub sink_repo: Option<String>,
    /// Credential presented to the git remotes; falls back to `auth_token`
    /// when empty.
    #[serde(skip_serializing)]
    pub remote_token: String,
    /// Bearer token HTTP clients must present.
    #[serde(skip_serializing)]
    pub auth_token: String,
    /// Serve pulls to clients without a bearer token.
    pub allow_anonymous_read: bool,
    pub max_bundle_size: u64,
    pub shutdown_timeout_secs: u64,
    pub git: GitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            scratch_dir: std::env::temp_dir().join("git-bundle-sync"),
            source_repo: None,
            sink_repo: None,
            remote_token: String::new(),
            auth_token: String::new(),
            allow_anonymous_read: false,
            max_bundle_size: 512 * 1024 * 1024,
            shutdown_timeout_secs: 10,
            git: GitConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.auth_token.is_empty() {
            return Err(ServerError::Config("auth-token must be set".into()));
        }
        if self.source_repo.is_none() && self.sink_repo.is_none() {
            return Err(ServerError::Config("either source-repo or sink-repo must be set".into()));
        }
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(ServerError::Config("scratch-dir must be set".into()));
        }
        if self.max_bundle_size == 0 {
            return Err(ServerError::Config("max-bundle-size must be positive".into()));
        }
        Ok(())
    }

    /// Token used when talking to the git remotes.
    pub fn effective_remote_token(&self) -> &str {
        if self.remote_token.is_empty() {
            &self.auth_token
        } else {
            &self.remote_token
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("scratch_dir", &self.scratch_dir)
            .field("source_repo", &self.source_repo)
            .field("sink_repo", &self.sink_repo)
            .field("remote_token", &redact(&self.remote_token))
            .field("auth_token", &redact(&self.auth_token))
            .field("allow_anonymous_read", &self.allow_anonymous_read)
            .field("max_bundle_size", &self.max_bundle_size)
            .field("shutdown_timeout_secs", &self.shutdown_timeout_secs)
            .field("git", &self.git)
            .finish()
    }
}

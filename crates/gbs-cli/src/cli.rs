use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gbs",
    about = "git-bundle-sync: move one branch between remotes as git bundles",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, global = true, env = "GBS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "GBS_LOG_JSON")]
    pub log_json: bool,

    #[arg(long, global = true, env = "GBS_FORMAT", default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Show the integrity report and heads of a bundle file
    Inspect(InspectArgs),
    /// Print the mirror directory used for a repository branch
    Resolve(ResolveArgs),
}

/// Flags override values loaded from `--config`.
#[derive(Args, Default)]
pub struct ServeArgs {
    /// TOML file with the base configuration.
    #[arg(long, env = "GBS_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long, env = "GBS_BIND_ADDR")]
    pub bind: Option<SocketAddr>,
    /// Root of mirrors and scratch files.
    #[arg(long, env = "GBS_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,
    /// Repository exported by `GET /pull/{branch}`.
    #[arg(long, env = "GBS_SOURCE_REPO")]
    pub source_repo: Option<String>,
    /// Repository fed by `POST /push/{branch}`.
    #[arg(long, env = "GBS_SINK_REPO")]
    pub sink_repo: Option<String>,
    /// Bearer token clients must present.
    #[arg(long, env = "GBS_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,
    /// Token presented to the git remotes. Defaults to the auth token.
    #[arg(long, env = "GBS_REMOTE_TOKEN", hide_env_values = true)]
    pub remote_token: Option<String>,
    #[arg(long, env = "GBS_ALLOW_ANONYMOUS_READ")]
    pub allow_anonymous_read: bool,
    /// Largest accepted push body, in bytes.
    #[arg(long, env = "GBS_MAX_BUNDLE_SIZE")]
    pub max_bundle_size: Option<u64>,
    #[arg(long, env = "GBS_GIT")]
    pub git: Option<String>,
    /// Per-command timeout for git, e.g. `5m` or `90s`.
    #[arg(long, env = "GBS_GIT_TIMEOUT")]
    pub git_timeout: Option<String>,
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Repository to verify against. A partial bundle only verifies in a
    /// repository that has its prerequisite; defaults to an empty one.
    #[arg(long)]
    pub repo: Option<PathBuf>,
    #[arg(long, env = "GBS_GIT", default_value = "git")]
    pub git: String,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub url: String,
    pub branch: String,
    #[arg(long, env = "GBS_SCRATCH_DIR")]
    pub root: Option<PathBuf>,
}

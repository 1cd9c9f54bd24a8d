use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use gbs_bundle::BundleCodec;
use gbs_git::{Classifier, GitCommand, GitConfig, GitRunner};
use gbs_server::{GbsServer, ServerConfig};
use gbs_sync::SyncEngine;
use gbs_types::{parse_duration, BundleInfo, Head, RemoteRepoRef};
use serde_json::json;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Inspect(args) => cmd_inspect(args, cli.format).await,
        Command::Resolve(args) => cmd_resolve(args, cli.format),
    }
}

/// Layer the flags over the `--config` file, or over the defaults when no
/// file is given.
pub fn build_config(args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.scratch_dir {
        config.scratch_dir = dir;
    }
    if args.source_repo.is_some() {
        config.source_repo = args.source_repo;
    }
    if args.sink_repo.is_some() {
        config.sink_repo = args.sink_repo;
    }
    if let Some(token) = args.auth_token {
        config.auth_token = token;
    }
    if let Some(token) = args.remote_token {
        config.remote_token = token;
    }
    if args.allow_anonymous_read {
        config.allow_anonymous_read = true;
    }
    if let Some(size) = args.max_bundle_size {
        config.max_bundle_size = size;
    }
    if let Some(program) = args.git {
        config.git.program = program;
    }
    if let Some(raw) = args.git_timeout {
        let timeout = parse_duration(&raw).with_context(|| format!("invalid --git-timeout '{raw}'"))?;
        config.git.command_timeout_secs = timeout.as_secs().max(1);
    }
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = build_config(args)?;
    tracing::debug!(?config, "effective configuration");
    let server = GbsServer::new(config).context("invalid server configuration")?;
    server.serve().await?;
    Ok(())
}

async fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = GitConfig { program: args.git, ..GitConfig::default() };
    let runner = GitRunner::new(&config, Classifier::default());
    let file = std::fs::canonicalize(&args.file)
        .with_context(|| format!("cannot open {}", args.file.display()))?;

    let scratch = tempfile::tempdir().context("failed to create a scratch directory")?;
    let repo = match args.repo {
        Some(repo) => repo,
        None => {
            let repo = scratch.path().join("repo");
            std::fs::create_dir_all(&repo)?;
            runner
                .run(GitCommand::new("init").arg("--quiet").current_dir(&repo))
                .await
                .context("failed to initialize a scratch repository")?;
            repo
        }
    };

    let codec = BundleCodec::new(runner, &repo, "", scratch.path());
    let info = codec.verify_file(&file).await.context("bundle verification failed")?;
    let heads = codec.list_heads_file(&file).await.context("failed to list bundle heads")?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "info": info, "heads": heads }))?);
        }
        OutputFormat::Text => print_inspection(&file, &info, &heads),
    }
    Ok(())
}

fn print_inspection(file: &Path, info: &BundleInfo, heads: &[Head]) {
    println!("{} {}", "Bundle".bold(), file.display());
    let kind = if info.is_complete { "complete".green() } else { "partial".yellow() };
    println!("  History: {kind}");
    if !info.requires_ref.is_empty() {
        println!("  Requires: {}", info.requires_ref.cyan());
    }
    println!("  Contains: {}", info.contains_ref.cyan());
    if !info.hash_algorithm.is_empty() {
        println!("  Hash: {}", info.hash_algorithm);
    }
    println!("  Heads:");
    for head in heads {
        println!("    {} {}", head.commit_id.yellow(), head.ref_name);
    }
}

fn cmd_resolve(args: ResolveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let root = args.root.unwrap_or_else(|| ServerConfig::default().scratch_dir);
    let engine = SyncEngine::new(root, GitRunner::default());
    let mirror = engine.mirror(RemoteRepoRef::new(&args.url, &args.branch, ""))?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "url": args.url, "branch": args.branch, "workdir": mirror.workdir() })
        ),
        OutputFormat::Text => println!("{}", mirror.workdir().display()),
    }
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use ghas_core::Purpose;
use ghas_github::{GitHubPlatform, GitHubSettings, RetryPolicy};
use ghas_notify::LogNotifier;
use ghas_runner::{Config, Fleet};

#[derive(Parser)]
#[command(name = "ghas-compliance", version)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter configuration for an organization
    Init {
        #[arg(long)]
        org: String,
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Open CodeQL workflow pull requests on unconfigured repositories
    Configure(RunArgs),

    /// Export recent databases and analyses to the compliance organization
    Promote(RunArgs),

    /// Check coverage, tool versions and manifests; notify owners
    Verify(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Process only this repository (`name` or `owner/name`)
    #[arg(long)]
    repo: Option<String>,

    /// Probe and plan, but send no notifications and touch no issues
    #[arg(long)]
    dry_run: bool,
}

fn settings(cfg: &Config) -> GitHubSettings {
    GitHubSettings {
        api_base_url: cfg.platform.api_url.clone(),
        uploads_base_url: cfg.platform.uploads_url.clone(),
        installations: cfg.integrations.installations(),
        retry: RetryPolicy {
            max_attempts: cfg.platform.max_attempts,
            base_backoff_ms: cfg.platform.base_backoff_ms,
        },
        connect_timeout: Duration::from_secs(cfg.platform.connect_timeout_secs),
        timeout: Duration::from_secs(cfg.platform.timeout_secs),
    }
}

async fn run(cli_config: Option<PathBuf>, json: bool, purpose: Purpose, args: RunArgs) -> anyhow::Result<()> {
    let path = cli_config.unwrap_or_else(Config::default_path);
    let mut cfg = Config::load_from(&path)?;
    cfg.apply_env(|k| std::env::var(k).ok());
    if args.dry_run {
        cfg.notifications.dry_run = true;
    }

    let token = std::env::var(&cfg.platform.token_env)
        .map_err(|_| anyhow!("environment variable {} is not set", cfg.platform.token_env))?;
    let platform = GitHubPlatform::new(SecretString::from(token), settings(&cfg)).context("build GitHub client")?;
    let fleet = Fleet::new(Arc::new(platform), Arc::new(LogNotifier), cfg)?;

    let report = fleet.run(purpose, args.repo.as_deref()).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let default_level = if Config::debug_requested(|k| std::env::var(k).ok()) {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Init { org, path } => {
            let path = path.or(cli.config).unwrap_or_else(Config::default_path);
            Config::default_for_org(&org).save_to(&path)?;
            println!("Wrote {}", path.display());
        }
        Command::Configure(args) => run(cli.config, cli.json, Purpose::Configure, args).await?,
        Command::Promote(args) => run(cli.config, cli.json, Purpose::Promote, args).await?,
        Command::Verify(args) => run(cli.config, cli.json, Purpose::Verify, args).await?,
    }
    Ok(())
}

//! promote - pin a freshly built image in a GitOps repository
//!
//! CLI binary run from CI after an image build.

use anyhow::{Context, Result};
use clap::Parser;
use gitops_promote::config::Config;
use gitops_promote::logging;
use tracing::info;

mod cli;

#[derive(Parser)]
#[command(name = "promote")]
#[command(about = "Promote a built image through GitOps kustomize manifests")]
#[command(version)]
struct Cli {
    /// Environment to leave untouched
    #[arg(short, long, value_name = "ENVIRONMENT")]
    ignore: Option<String>,

    /// Dry run - show what would be done without making changes
    #[arg(long)]
    dry_run: bool,

    /// Show every step and debug logs
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let config = Config::from_env(cli.ignore).context("failed to load configuration")?;
    info!(?config, "configuration loaded");

    cli::run_promote(&config, cli.dry_run, cli.verbose).await?;

    Ok(())
}

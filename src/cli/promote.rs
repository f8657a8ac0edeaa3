//! Promote command - pin the built image in every environment

use crate::cli::progress::CliProgress;
use crate::cli::style::{Stream, Stylize, hyperlink_url};
use anstream::println;
use gitops_promote::config::Config;
use gitops_promote::error::Result;
use gitops_promote::gateway::create_gateway;
use gitops_promote::promote::{PromotionRequest, run_promotion};
use tracing::info;

/// Run the promote command
pub async fn run_promote(config: &Config, dry_run: bool, verbose: bool) -> Result<()> {
    let request = PromotionRequest::from(config);
    println!(
        "Promoting {} {} to {} in {}/{}",
        request.service.emphasis(),
        request.pin.name.accent(),
        request.short_sha().accent(),
        config.repo_owner,
        config.repo_name
    );
    if let Some(skip) = &config.skip_environment {
        println!("  {} {}", "ignoring".muted(), skip.accent());
    }
    println!();

    let gateway = create_gateway(config).await?;
    let progress = CliProgress::new(verbose);
    let report = run_promotion(
        request,
        config.skip_environment.as_deref(),
        gateway.as_ref(),
        &progress,
        dry_run,
    )
    .await?;

    if dry_run {
        return Ok(());
    }

    info!(
        environments = report.units.len(),
        committed = report.committed(),
        "promotion finished"
    );

    let prs: Vec<_> = report.pull_requests().collect();
    println!();
    println!(
        "Promoted {} environment{}",
        report.committed().accent(),
        if report.committed() == 1 { "" } else { "s" }
    );
    for pr in prs {
        println!(
            "  PR #{} awaiting review: {}",
            pr.number,
            hyperlink_url(Stream::Stdout, &pr.html_url)
        );
    }

    Ok(())
}

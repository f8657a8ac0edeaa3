//! Styled progress output for the promote command

use crate::cli::style::{Stream, Stylize, arrow, check, cross, hyperlink_url};
use anstream::{eprintln, println};
use async_trait::async_trait;
use gitops_promote::error::Error;
use gitops_promote::promote::{Phase, ProgressCallback, UnitState};
use gitops_promote::types::PullRequest;

/// Prints promotion progress to stdout, failures to stderr
///
/// Intermediate unit states are only shown in verbose mode.
pub struct CliProgress {
    /// Show every unit transition
    pub verbose: bool,
}

impl CliProgress {
    /// Create a progress printer
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_phase(&self, phase: Phase) {
        match phase {
            Phase::Resolving => println!("{}", "Resolving environments...".emphasis()),
            Phase::Planning => println!("{}", "Planning...".emphasis()),
            Phase::Promoting => println!("{}", "Promoting...".emphasis()),
            Phase::Complete => println!("{} {}", check(), "Done".success()),
        }
    }

    async fn on_unit_state(&self, environment: &str, state: UnitState) {
        match state {
            UnitState::Committed => {
                println!("  {} Committed {}", check(), environment.accent());
            }
            UnitState::ReviewerRequested => {
                println!("  {} Requested review for {}", check(), environment.accent());
            }
            UnitState::UpToDate => {
                println!("  - {} {}", environment.accent(), "already up to date".warn());
            }
            UnitState::Failed => {
                eprintln!("  {} {} failed", cross(), environment.accent().for_stderr());
            }
            UnitState::Done | UnitState::PullRequestOpened => {}
            _ if self.verbose => {
                println!("  {} {} {}", arrow(), environment, state.to_string().muted());
            }
            _ => {}
        }
    }

    async fn on_pr_created(&self, environment: &str, pr: &PullRequest) {
        let number = format!("#{}", pr.number);
        println!(
            "  {} Opened PR {} for {}",
            check(),
            number.accent(),
            environment.accent()
        );
        println!("    {}", hyperlink_url(Stream::Stdout, &pr.html_url));
    }

    // The error itself is reported once, by `main`.
    async fn on_error(&self, err: &Error) {
        eprintln!("{} Promotion aborted: {}", cross(), abort_reason(err).error());
    }

    async fn on_message(&self, message: &str) {
        println!("{message}");
    }
}

/// Short category of an aborting error
const fn abort_reason(err: &Error) -> &'static str {
    match err {
        Error::Config(_) => "configuration",
        Error::MalformedDocument(_) => "malformed manifest",
        Error::NotFound(_) => "missing path",
        Error::Conflict { .. } => "concurrent change",
        Error::Remote(_) | Error::Http(_) => "GitHub request failed",
        Error::Auth(_) => "authentication",
        Error::Internal(_) => "internal error",
    }
}

//! Phase 2: promotion planning
//!
//! Orders environments so every direct environment is promoted before any
//! gated one, and fixes the branch, commit message and pull request text of
//! each unit up front.

use crate::config::{Config, SHORT_SHA_LEN};
use crate::promote::resolve::manifest_path;
use crate::types::{Environment, ImagePin, NewPullRequest, PullRequest, Strategy};
use rand::Rng;
use std::fmt;

/// Branch that direct promotions commit to and pull requests target
pub const BASE_BRANCH: &str = "master";

/// Description of every generated pull request
pub const PR_BODY: &str = "This is an automated pull-request.";

const BRANCH_PREFIX: &str = "auto";
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 6;

/// Lifecycle of one environment's promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Not started
    Planned,
    /// Gated only: review branch created off the base branch
    BranchCreated,
    /// Manifest read
    Read,
    /// New manifest computed
    Patched,
    /// New manifest committed
    Committed,
    /// Gated only: pull request opened
    PullRequestOpened,
    /// Gated only: reviewer requested
    ReviewerRequested,
    /// Finished
    Done,
    /// Finished without a commit, the manifest already pinned the image
    UpToDate,
    /// Aborted the run
    Failed,
}

impl UnitState {
    /// Whether no further transition can happen
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::UpToDate | Self::Failed)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Planned => "planned",
            Self::BranchCreated => "branch created",
            Self::Read => "read",
            Self::Patched => "patched",
            Self::Committed => "committed",
            Self::PullRequestOpened => "pull request opened",
            Self::ReviewerRequested => "reviewer requested",
            Self::Done => "done",
            Self::UpToDate => "up to date",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Inputs of a promotion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRequest {
    /// Service whose manifests are patched
    pub service: String,
    /// Image and tag to pin
    pub pin: ImagePin,
    /// Full commit hash of the build
    pub git_sha: String,
    /// User credited in sign-offs and asked for review
    pub username: Option<String>,
}

impl PromotionRequest {
    /// Abbreviated commit hash used in messages and titles
    pub fn short_sha(&self) -> &str {
        self.git_sha
            .get(..SHORT_SHA_LEN)
            .unwrap_or(&self.git_sha)
    }
}

impl From<&Config> for PromotionRequest {
    fn from(config: &Config) -> Self {
        Self {
            service: config.source_repo_name.clone(),
            pin: config.image_pin(),
            git_sha: config.git_sha.clone(),
            username: config.username.clone(),
        }
    }
}

/// One environment's promotion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionUnit {
    /// Target environment
    pub environment: Environment,
    /// Direct commit or pull request
    pub strategy: Strategy,
    /// Manifest path in the GitOps repository
    pub path: String,
    /// Branch the manifest is written to
    pub branch: String,
    /// Commit message
    pub message: String,
    /// Pull request to open, gated units only
    pub pull_request: Option<NewPullRequest>,
    /// Pull request opened for this unit
    pub opened: Option<PullRequest>,
    /// Current state
    pub state: UnitState,
}

/// Ordered promotion units for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionPlan {
    /// Run inputs
    pub request: PromotionRequest,
    /// Units in execution order
    pub units: Vec<PromotionUnit>,
}

impl PromotionPlan {
    /// Whether there is nothing to promote
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Put direct environments before gated ones, keeping relative order
pub fn order_environments(environments: Vec<Environment>) -> Vec<Environment> {
    let (gated, mut ordered): (Vec<_>, Vec<_>) =
        environments.into_iter().partition(Environment::is_gated);
    ordered.extend(gated);
    ordered
}

/// Name a fresh review branch: `auto-<sha>-<random suffix>`
pub fn generate_branch_name(git_sha: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())]))
        .collect();
    format!("{BRANCH_PREFIX}-{git_sha}-{suffix}")
}

/// Commit message for a manifest update
pub fn commit_message(
    service: &str,
    environment: &str,
    short_sha: &str,
    username: Option<&str>,
) -> String {
    let mut message = format!("Update {service} {environment} to {short_sha}");
    if let Some(username) = username {
        message.push_str(&format!("\n\nSigned-off-by: {username}\n"));
    }
    message
}

/// Title of a gated promotion's pull request
pub fn pull_request_title(service: &str, environment: &str, short_sha: &str) -> String {
    format!("Deploy `{service}` to {environment}, {short_sha}")
}

/// Create a promotion plan
pub fn create_promotion_plan(
    request: PromotionRequest,
    environments: Vec<Environment>,
) -> PromotionPlan {
    let short_sha = request.short_sha().to_string();
    let username = request.username.as_deref();

    let units = order_environments(environments)
        .into_iter()
        .map(|environment| {
            let strategy = environment.strategy();
            let message = commit_message(&request.service, &environment.name, &short_sha, username);
            let path = manifest_path(&request.service, &environment.name);
            let (branch, pull_request) = match strategy {
                Strategy::Direct => (BASE_BRANCH.to_string(), None),
                Strategy::Gated => {
                    let branch = generate_branch_name(&request.git_sha);
                    let pr = NewPullRequest {
                        title: pull_request_title(&request.service, &environment.name, &short_sha),
                        head: branch.clone(),
                        base: BASE_BRANCH.to_string(),
                        body: PR_BODY.to_string(),
                        maintainer_can_modify: true,
                    };
                    (branch, Some(pr))
                }
            };
            PromotionUnit {
                environment,
                strategy,
                path,
                branch,
                message,
                pull_request,
                opened: None,
                state: UnitState::Planned,
            }
        })
        .collect();

    PromotionPlan { request, units }
}

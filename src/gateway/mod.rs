//! Remote repository access
//!
//! Everything the promotion needs from the GitOps repository goes through
//! [`RepoGateway`], so the planner and executor can run against an
//! in-memory fake in tests.

mod factory;
mod github;

pub use factory::create_gateway;
pub use github::GitHubGateway;

use crate::error::Result;
use crate::types::{FileUpdate, NewPullRequest, PullRequest, RemoteContent, RepoConfig};
use async_trait::async_trait;

/// Operations on the bound GitOps repository
#[async_trait]
pub trait RepoGateway: Send + Sync {
    /// Read a file or list a directory, at `git_ref` or the default branch
    async fn get_content(&self, path: &str, git_ref: Option<&str>) -> Result<RemoteContent>;

    /// Write a file, failing with a conflict if its hash moved
    async fn put_content(&self, update: &FileUpdate) -> Result<()>;

    /// Resolve a ref such as `heads/master` to a commit hash
    async fn get_ref(&self, git_ref: &str) -> Result<String>;

    /// Create a ref such as `refs/heads/<branch>` pointing at `sha`
    async fn create_ref(&self, git_ref: &str, sha: &str) -> Result<()>;

    /// Open a pull request
    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequest>;

    /// Ask users to review a pull request
    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()>;

    /// Repository this gateway operates on
    fn config(&self) -> &RepoConfig;
}

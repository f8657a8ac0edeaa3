//! Gateway factory
//!
//! Authenticates as the GitHub App installation and binds a client to the
//! target repository.

use crate::auth::get_github_auth;
use crate::config::Config;
use crate::error::Result;
use crate::gateway::{GitHubGateway, RepoGateway};
use tracing::debug;

/// Create a gateway for the repository named in `config`
pub async fn create_gateway(config: &Config) -> Result<Box<dyn RepoGateway>> {
    let auth = get_github_auth(&config.credentials, config.api_url.as_deref()).await?;
    debug!(expires_at = ?auth.expires_at, "installation token acquired");
    Ok(Box::new(GitHubGateway::new(&auth.token, config.repo_config())?))
}

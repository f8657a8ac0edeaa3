//! Authentication against the GitHub API
//!
//! The tool runs as a GitHub App installation; see [`get_github_auth`].

mod github_app;

pub use github_app::{AppClaims, DEFAULT_API_URL, app_jwt, exchange_installation_token};

use crate::config::AppCredentials;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::fmt;

/// Installation token for repository calls
#[derive(Clone)]
pub struct GitHubAuthConfig {
    /// Access token
    pub token: String,
    /// When the token stops working, if GitHub reported it
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for GitHubAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubAuthConfig")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Obtain an installation token for the configured app
pub async fn get_github_auth(
    credentials: &AppCredentials,
    api_url: Option<&str>,
) -> Result<GitHubAuthConfig> {
    let http = reqwest::Client::new();
    exchange_installation_token(&http, api_url.unwrap_or(DEFAULT_API_URL), credentials).await
}

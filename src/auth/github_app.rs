//! GitHub App installation tokens
//!
//! The app signs a short-lived RS256 JWT with its private key and trades it
//! for an installation access token, which then authenticates every
//! repository call.

use crate::auth::GitHubAuthConfig;
use crate::config::AppCredentials;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const AGENT: &str = concat!("gitops-promote/", env!("CARGO_PKG_VERSION"));

/// Claims of the app JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    /// Issued-at, backdated to absorb clock drift
    pub iat: i64,
    /// Expiry, under GitHub's ten minute limit
    pub exp: i64,
    /// App ID
    pub iss: String,
}

impl AppClaims {
    /// Claims for `app_id` issued at `now`
    pub fn new(app_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            iat: (now - Duration::seconds(60)).timestamp(),
            exp: (now + Duration::minutes(9)).timestamp(),
            iss: app_id.to_string(),
        }
    }
}

/// Sign the app JWT
pub fn app_jwt(credentials: &AppCredentials, now: DateTime<Utc>) -> Result<String> {
    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
        .map_err(|e| Error::Auth(format!("invalid app private key: {e}")))?;
    encode(
        &Header::new(Algorithm::RS256),
        &AppClaims::new(credentials.app_id, now),
        &key,
    )
    .map_err(|e| Error::Auth(format!("failed to sign app token: {e}")))
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Exchange the app JWT for an installation access token
pub async fn exchange_installation_token(
    http: &reqwest::Client,
    api_url: &str,
    credentials: &AppCredentials,
) -> Result<GitHubAuthConfig> {
    let jwt = app_jwt(credentials, Utc::now())?;
    let url = format!(
        "{}/app/installations/{}/access_tokens",
        api_url.trim_end_matches('/'),
        credentials.installation_id
    );

    debug!(installation_id = credentials.installation_id, "requesting installation token");
    let response = http
        .post(&url)
        .bearer_auth(jwt)
        .header(ACCEPT, "application/vnd.github+json")
        .header(USER_AGENT, AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        return Err(Error::Auth(format!(
            "installation token request failed ({status}): {detail}"
        )));
    }

    let granted: AccessTokenResponse = response.json().await?;
    Ok(GitHubAuthConfig {
        token: granted.token,
        expires_at: granted.expires_at,
    })
}

//! Run configuration
//!
//! Resolved once at startup from the CI environment and passed by reference
//! into every component. Two CI providers are recognised:
//!
//! - GitHub Actions (`GITHUB_ACTIONS=true`): credentials come from action
//!   inputs (`INPUT_*`), commit and repository details from the push event
//!   payload at `GITHUB_EVENT_PATH`.
//! - CircleCI (anything else): plain environment variables.

use crate::error::{Error, Result};
use crate::types::{ImagePin, RepoConfig};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;

/// Image name used when `IMAGE_NAME` is unset
pub const DEFAULT_IMAGE_NAME: &str = "app-image";

/// GitOps repository name used when `REPO_NAME` is unset
pub const DEFAULT_REPO_NAME: &str = "k8s";

/// Length of the abbreviated commit sha used in messages and titles
pub const SHORT_SHA_LEN: usize = 7;

/// CI provider the run was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiProvider {
    /// GitHub Actions
    GitHubActions,
    /// CircleCI
    CircleCi,
}

/// GitHub App credentials used to mint an installation token
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredentials {
    /// GitHub App ID
    pub app_id: u64,
    /// Installation ID of the app on the GitOps repository owner
    pub installation_id: u64,
    /// PEM encoded RSA private key of the app
    pub private_key: String,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Immutable configuration for one promotion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where the configuration was read from
    pub ci_provider: CiProvider,
    /// Credentials for the gateway's auth provider
    pub credentials: AppCredentials,
    /// Owner of the GitOps repository
    pub repo_owner: String,
    /// Name of the GitOps repository
    pub repo_name: String,
    /// Service whose manifests are patched (`services/<source_repo_name>/`)
    pub source_repo_name: String,
    /// Image entry to pin
    pub image_name: String,
    /// Optional `newName` override for the image entry
    pub new_name: Option<String>,
    /// Full commit sha, used as the new tag
    pub git_sha: String,
    /// User to sign off commits and review pull requests
    pub username: Option<String>,
    /// Environment to leave untouched
    pub skip_environment: Option<String>,
    /// Custom API base URL (GitHub Enterprise)
    pub api_url: Option<String>,
}

#[derive(Deserialize)]
struct PushEvent {
    after: String,
    repository: EventRepository,
    sender: EventUser,
}

#[derive(Deserialize)]
struct EventRepository {
    name: String,
    owner: EventUser,
}

#[derive(Deserialize)]
struct EventUser {
    login: String,
}

/// Variable lookup that treats empty values as absent
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| Error::Config(format!("Missing environment variable {key}")))
    }

    /// Read a GitHub Actions input the way the actions toolkit exposes it
    fn input(&self, name: &str) -> Result<String> {
        let key = format!("INPUT_{}", name.replace(' ', "_").to_uppercase());
        self.get(&key)
            .ok_or_else(|| Error::Config(format!("Input required and not supplied: {name}")))
    }
}

impl Config {
    /// Resolve configuration from the process environment
    pub fn from_env(skip_environment: Option<String>) -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), skip_environment)
    }

    /// Resolve configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F, skip_environment: Option<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let image_name = vars
            .get("IMAGE_NAME")
            .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string());
        let repo_name = vars
            .get("REPO_NAME")
            .unwrap_or_else(|| DEFAULT_REPO_NAME.to_string());
        let skip_environment = skip_environment.filter(|s| !s.is_empty());

        let config = if vars.get("GITHUB_ACTIONS").as_deref() == Some("true") {
            let credentials = AppCredentials {
                private_key: normalize_private_key(&vars.input("PRIVATE_KEY_PEM")?),
                app_id: parse_id("APP_ID", vars.input("APP_ID")?.trim())?,
                installation_id: parse_id("INSTALLATION_ID", vars.input("INSTALLATION_ID")?.trim())?,
            };
            let event_path = vars.require("GITHUB_EVENT_PATH")?;
            let event = read_push_event(Path::new(&event_path))?;
            Self {
                ci_provider: CiProvider::GitHubActions,
                credentials,
                repo_owner: event.repository.owner.login,
                repo_name,
                source_repo_name: event.repository.name,
                image_name,
                new_name: vars.get("NEW_NAME"),
                git_sha: event.after,
                username: Some(event.sender.login).filter(|u| !u.is_empty()),
                skip_environment,
                api_url: vars.get("GITHUB_API_URL"),
            }
        } else {
            let credentials = AppCredentials {
                private_key: normalize_private_key(&vars.require("PRIVATE_KEY_PEM")?),
                app_id: parse_id("APP_ID", &vars.require("APP_ID")?)?,
                installation_id: parse_id("INSTALLATION_ID", &vars.require("INSTALLATION_ID")?)?,
            };
            Self {
                ci_provider: CiProvider::CircleCi,
                credentials,
                repo_owner: vars.require("CIRCLE_PROJECT_USERNAME")?,
                repo_name,
                source_repo_name: vars.require("CIRCLE_PROJECT_REPONAME")?,
                image_name,
                new_name: vars.get("NEW_NAME"),
                git_sha: vars.require("CIRCLE_SHA1")?,
                username: vars.get("CIRCLE_USERNAME"),
                skip_environment,
                api_url: vars.get("GITHUB_API_URL"),
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("repository owner", &self.repo_owner),
            ("repository name", &self.repo_name),
            ("source repository name", &self.source_repo_name),
            ("image name", &self.image_name),
            ("commit sha", &self.git_sha),
            ("private key", &self.credentials.private_key),
        ];
        for (what, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{what} must not be empty")));
            }
        }
        Ok(())
    }

    /// Abbreviated commit sha for messages and titles
    pub fn short_sha(&self) -> &str {
        let end = self
            .git_sha
            .char_indices()
            .nth(SHORT_SHA_LEN)
            .map_or(self.git_sha.len(), |(i, _)| i);
        &self.git_sha[..end]
    }

    /// Image pin this run writes into every manifest
    pub fn image_pin(&self) -> ImagePin {
        let pin = ImagePin::new(&self.image_name, &self.git_sha);
        match &self.new_name {
            Some(new_name) => pin.with_new_name(new_name),
            None => pin,
        }
    }

    /// The GitOps repository the gateway should be bound to
    pub fn repo_config(&self) -> RepoConfig {
        RepoConfig {
            owner: self.repo_owner.clone(),
            repo: self.repo_name.clone(),
            api_url: self.api_url.clone(),
        }
    }
}

/// Restore line breaks in a PEM passed through a single-line CI input
///
/// Some CI input mechanisms cannot carry multi-line secrets, so line breaks
/// are encoded as `^`.
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace('^', "\n").trim().to_string()
}

fn parse_id(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a number, got {value:?}")))
}

fn read_push_event(path: &Path) -> Result<PushEvent> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("cannot read event payload {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("event payload is not a push event: {e}")))
}

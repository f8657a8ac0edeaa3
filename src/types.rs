//! Core types for gitops-promote

use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment name that requires a reviewed pull request
pub const GATED_ENVIRONMENT: &str = "prod";

/// Whether an environment name is gated behind a pull request
pub fn is_gated(name: &str) -> bool {
    name == GATED_ENVIRONMENT
}

/// How a promotion reaches its environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Commit straight to the base branch
    Direct,
    /// Commit to a fresh branch and open a pull request
    Gated,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Gated => write!(f, "pull request"),
        }
    }
}

/// A deployment target discovered under `services/<service>/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    /// Directory name of the environment
    pub name: String,
}

impl Environment {
    /// Create an environment from its directory name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Whether this environment needs a pull request
    pub fn is_gated(&self) -> bool {
        is_gated(&self.name)
    }

    /// Commit strategy for this environment
    pub fn strategy(&self) -> Strategy {
        if self.is_gated() {
            Strategy::Gated
        } else {
            Strategy::Direct
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Image pin written into a manifest's `images` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePin {
    /// Value matched against `images[].name`
    pub name: String,
    /// Value written to `images[].newTag`
    pub new_tag: String,
    /// Optional value written to `images[].newName`
    pub new_name: Option<String>,
}

impl ImagePin {
    /// Pin `name` to `new_tag`
    pub fn new(name: impl Into<String>, new_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            new_tag: new_tag.into(),
            new_name: None,
        }
    }

    /// Also override the image repository
    #[must_use]
    pub fn with_new_name(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }
}

/// A file read from the remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Repository-relative path
    pub path: String,
    /// Base64 content as returned by the API (may contain line breaks)
    pub content: String,
    /// Content hash, required for writing the file back
    pub sha: String,
}

/// Kind of a directory listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Dir,
    /// Symbolic link
    Symlink,
    /// Git submodule
    Submodule,
}

/// One entry of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (last path segment)
    pub name: String,
    /// Repository-relative path
    pub path: String,
    /// Entry kind
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Result of reading a remote path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteContent {
    /// The path is a file
    File(RemoteFile),
    /// The path is a directory
    Directory(Vec<DirEntry>),
}

/// A pull request opened by a gated promotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Web URL for the PR
    pub html_url: String,
}

/// Parameters for opening a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    /// PR title
    pub title: String,
    /// Branch holding the change
    pub head: String,
    /// Branch to merge into
    pub base: String,
    /// PR description
    pub body: String,
    /// Allow maintainers to push to the head branch
    pub maintainer_can_modify: bool,
}

/// A file write through the contents API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    /// Repository-relative path
    pub path: String,
    /// Commit message
    pub message: String,
    /// New content, base64 encoded
    pub content: String,
    /// Hash of the content being replaced
    pub sha: String,
    /// Target branch (None for the default branch)
    pub branch: Option<String>,
}

/// Repository the gateway is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Custom API base URL (None for api.github.com)
    pub api_url: Option<String>,
}

//! GitHub gateway implementation

use crate::error::{Error, Result};
use crate::gateway::RepoGateway;
use crate::types::{
    DirEntry, EntryKind, FileUpdate, NewPullRequest, PullRequest, RemoteContent, RemoteFile,
    RepoConfig,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// GitHub gateway using octocrab
pub struct GitHubGateway {
    client: Octocrab,
    config: RepoConfig,
}

#[derive(Serialize)]
struct RefQuery<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<DirEntry>),
    Item(ContentItem),
}

#[derive(Deserialize)]
struct ContentItem {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: EntryKind,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct PutContentBody<'a> {
    message: &'a str,
    content: &'a str,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    sha: &'a str,
}

#[derive(Serialize)]
struct ReviewersBody<'a> {
    reviewers: &'a [String],
}

impl GitHubGateway {
    /// Create a gateway authenticated with `token`
    pub fn new(token: &str, config: RepoConfig) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        if let Some(ref api_url) = config.api_url {
            builder = builder
                .base_uri(api_url.as_str())
                .map_err(|e| Error::Remote(e.to_string()))?;
        }

        let client = builder.build().map_err(|e| Error::Remote(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn repo_route(&self, rest: &str) -> String {
        format!(
            "/repos/{}/{}/{rest}",
            urlencoding::encode(&self.config.owner),
            urlencoding::encode(&self.config.repo)
        )
    }
}

/// Percent-encode each segment of a slash-separated path
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map an API error, turning 404 and 409 into their dedicated variants
fn classify(err: octocrab::Error, what: &str) -> Error {
    if let octocrab::Error::GitHub { source, .. } = &err {
        match source.status_code.as_u16() {
            404 => return Error::NotFound(what.to_string()),
            409 => {
                return Error::Conflict {
                    path: what.to_string(),
                };
            }
            _ => {}
        }
    }
    Error::Remote(format!("{what}: {err}"))
}

#[async_trait]
impl RepoGateway for GitHubGateway {
    async fn get_content(&self, path: &str, git_ref: Option<&str>) -> Result<RemoteContent> {
        let route = self.repo_route(&format!("contents/{}", encode_path(path)));
        debug!(path, git_ref, "reading contents");

        let response: ContentsResponse = match git_ref {
            Some(git_ref) => self.client.get(route, Some(&RefQuery { git_ref })).await,
            None => self.client.get(route, None::<&()>).await,
        }
        .map_err(|e| classify(e, path))?;

        match response {
            ContentsResponse::Listing(entries) => Ok(RemoteContent::Directory(entries)),
            ContentsResponse::Item(item) if item.kind != EntryKind::File => Err(Error::NotFound(
                format!("{path} is a {:?}, not a file", item.kind),
            )),
            ContentsResponse::Item(item) => {
                let content = item.content.ok_or_else(|| {
                    Error::Remote(format!("{path}: no inline content returned"))
                })?;
                Ok(RemoteContent::File(RemoteFile {
                    path: item.path,
                    content,
                    sha: item.sha,
                }))
            }
        }
    }

    async fn put_content(&self, update: &FileUpdate) -> Result<()> {
        let route = self.repo_route(&format!("contents/{}", encode_path(&update.path)));
        let body = PutContentBody {
            message: &update.message,
            content: &update.content,
            sha: &update.sha,
            branch: update.branch.as_deref(),
        };
        debug!(path = %update.path, branch = ?update.branch, "writing contents");

        let _: serde_json::Value = self
            .client
            .put(route, Some(&body))
            .await
            .map_err(|e| classify(e, &update.path))?;
        Ok(())
    }

    async fn get_ref(&self, git_ref: &str) -> Result<String> {
        let route = self.repo_route(&format!("git/ref/{}", encode_path(git_ref)));
        let response: RefResponse = self
            .client
            .get(route, None::<&()>)
            .await
            .map_err(|e| classify(e, git_ref))?;
        Ok(response.object.sha)
    }

    async fn create_ref(&self, git_ref: &str, sha: &str) -> Result<()> {
        let route = self.repo_route("git/refs");
        debug!(git_ref, sha, "creating ref");
        let _: serde_json::Value = self
            .client
            .post(route, Some(&CreateRefBody { git_ref, sha }))
            .await
            .map_err(|e| classify(e, git_ref))?;
        Ok(())
    }

    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequest> {
        let route = self.repo_route("pulls");
        debug!(head = %pr.head, base = %pr.base, "opening pull request");
        self.client
            .post(route, Some(pr))
            .await
            .map_err(|e| classify(e, &format!("pull request from {}", pr.head)))
    }

    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()> {
        let route = self.repo_route(&format!("pulls/{number}/requested_reviewers"));
        let _: serde_json::Value = self
            .client
            .post(route, Some(&ReviewersBody { reviewers }))
            .await
            .map_err(|e| classify(e, &format!("reviewers for #{number}")))?;
        Ok(())
    }

    fn config(&self) -> &RepoConfig {
        &self.config
    }
}

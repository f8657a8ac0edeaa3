//! In-memory GitOps repository for testing
//!
//! These are test utilities - not every helper is used by every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use gitops_promote::error::{Error, Result};
use gitops_promote::gateway::RepoGateway;
use gitops_promote::manifest::{decode_content, encode_content};
use gitops_promote::types::{
    DirEntry, FileUpdate, NewPullRequest, PullRequest, RemoteContent, RemoteFile, RepoConfig,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_BRANCH: &str = "master";

/// A file as stored in one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub text: String,
    pub sha: String,
}

#[derive(Debug, Clone, Default)]
struct Branch {
    head: String,
    files: HashMap<String, StoredFile>,
}

/// Call record for a successful `put_content`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub path: String,
    pub branch: String,
    pub message: String,
    pub text: String,
}

/// Call record for `create_ref`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRefCall {
    pub git_ref: String,
    pub sha: String,
}

/// Call record for `request_reviewers`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCall {
    pub number: u64,
    pub reviewers: Vec<String>,
}

/// In-memory gateway
///
/// Branches hold independent file maps; listings are registered explicitly
/// so tests control their order. Writes are checked against the stored
/// content hash like the real contents API.
pub struct MockGateway {
    config: RepoConfig,
    next_sha: AtomicU64,
    next_pr_number: AtomicU64,
    branches: Mutex<HashMap<String, Branch>>,
    listings: Mutex<HashMap<String, Vec<DirEntry>>>,
    touch_after_read: Mutex<HashSet<String>>,
    // Call tracking
    read_calls: Mutex<Vec<(String, Option<String>)>>,
    write_calls: Mutex<Vec<WriteCall>>,
    create_ref_calls: Mutex<Vec<CreateRefCall>>,
    create_pr_calls: Mutex<Vec<NewPullRequest>>,
    review_calls: Mutex<Vec<ReviewCall>>,
    // Error injection
    error_on_put: Mutex<Option<String>>,
    error_on_create_ref: Mutex<Option<String>>,
    error_on_create_pr: Mutex<Option<String>>,
    error_on_review: Mutex<Option<String>>,
}

impl MockGateway {
    /// Create an empty repository with a `master` branch
    pub fn new() -> Self {
        let mut branches = HashMap::new();
        branches.insert(
            DEFAULT_BRANCH.to_string(),
            Branch {
                head: "master-head".to_string(),
                files: HashMap::new(),
            },
        );
        Self {
            config: RepoConfig {
                owner: "acme".to_string(),
                repo: "k8s".to_string(),
                api_url: None,
            },
            next_sha: AtomicU64::new(1),
            next_pr_number: AtomicU64::new(1),
            branches: Mutex::new(branches),
            listings: Mutex::new(HashMap::new()),
            touch_after_read: Mutex::new(HashSet::new()),
            read_calls: Mutex::new(Vec::new()),
            write_calls: Mutex::new(Vec::new()),
            create_ref_calls: Mutex::new(Vec::new()),
            create_pr_calls: Mutex::new(Vec::new()),
            review_calls: Mutex::new(Vec::new()),
            error_on_put: Mutex::new(None),
            error_on_create_ref: Mutex::new(None),
            error_on_create_pr: Mutex::new(None),
            error_on_review: Mutex::new(None),
        }
    }

    fn fresh_sha(&self) -> String {
        format!("blob-{}", self.next_sha.fetch_add(1, Ordering::SeqCst))
    }

    // === Setup methods ===

    /// Store a file on `master`
    pub fn add_file(&self, path: &str, text: &str) {
        let sha = self.fresh_sha();
        let mut branches = self.branches.lock().unwrap();
        let master = branches.get_mut(DEFAULT_BRANCH).unwrap();
        master.files.insert(
            path.to_string(),
            StoredFile {
                text: text.to_string(),
                sha,
            },
        );
    }

    /// Register a directory listing
    pub fn add_listing(&self, path: &str, entries: Vec<DirEntry>) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), entries);
    }

    /// Change a file's hash right after its next read, as a concurrent writer would
    pub fn touch_after_read(&self, path: &str) {
        self.touch_after_read
            .lock()
            .unwrap()
            .insert(path.to_string());
    }

    // === Error injection methods ===

    /// Make `put_content` return an error
    pub fn fail_put(&self, msg: &str) {
        *self.error_on_put.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `create_ref` return an error
    pub fn fail_create_ref(&self, msg: &str) {
        *self.error_on_create_ref.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `create_pull_request` return an error
    pub fn fail_create_pr(&self, msg: &str) {
        *self.error_on_create_pr.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `request_reviewers` return an error
    pub fn fail_request_reviewers(&self, msg: &str) {
        *self.error_on_review.lock().unwrap() = Some(msg.to_string());
    }

    // === Inspection methods ===

    /// Current file on a branch
    pub fn file(&self, branch: &str, path: &str) -> Option<StoredFile> {
        self.branches
            .lock()
            .unwrap()
            .get(branch)
            .and_then(|b| b.files.get(path).cloned())
    }

    /// Names of all branches
    pub fn branch_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.branches.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// All reads as (path, ref)
    pub fn get_read_calls(&self) -> Vec<(String, Option<String>)> {
        self.read_calls.lock().unwrap().clone()
    }

    /// All successful writes
    pub fn get_write_calls(&self) -> Vec<WriteCall> {
        self.write_calls.lock().unwrap().clone()
    }

    /// All `create_ref` calls
    pub fn get_create_ref_calls(&self) -> Vec<CreateRefCall> {
        self.create_ref_calls.lock().unwrap().clone()
    }

    /// All `create_pull_request` calls
    pub fn get_create_pr_calls(&self) -> Vec<NewPullRequest> {
        self.create_pr_calls.lock().unwrap().clone()
    }

    /// All `request_reviewers` calls
    pub fn get_review_calls(&self) -> Vec<ReviewCall> {
        self.review_calls.lock().unwrap().clone()
    }

    /// Assert the environments written, in order
    pub fn assert_written_paths(&self, expected: &[&str]) {
        let calls = self.get_write_calls();
        let paths: Vec<&str> = calls.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, expected, "unexpected writes: {calls:?}");
    }

    /// Assert no remote state was changed
    pub fn assert_untouched(&self) {
        assert!(self.get_write_calls().is_empty(), "unexpected writes");
        assert!(self.get_create_ref_calls().is_empty(), "unexpected refs");
        assert!(self.get_create_pr_calls().is_empty(), "unexpected PRs");
        assert!(self.get_review_calls().is_empty(), "unexpected reviews");
    }
}

#[async_trait]
impl RepoGateway for MockGateway {
    async fn get_content(&self, path: &str, git_ref: Option<&str>) -> Result<RemoteContent> {
        self.read_calls
            .lock()
            .unwrap()
            .push((path.to_string(), git_ref.map(str::to_string)));

        if let Some(entries) = self.listings.lock().unwrap().get(path) {
            return Ok(RemoteContent::Directory(entries.clone()));
        }

        let branch_name = git_ref.unwrap_or(DEFAULT_BRANCH);
        let mut branches = self.branches.lock().unwrap();
        let branch = branches
            .get_mut(branch_name)
            .ok_or_else(|| Error::NotFound(format!("branch {branch_name}")))?;
        let stored = branch
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        if self.touch_after_read.lock().unwrap().remove(path) {
            if let Some(file) = branch.files.get_mut(path) {
                file.sha = format!("{}-moved", file.sha);
            }
        }

        Ok(RemoteContent::File(RemoteFile {
            path: path.to_string(),
            content: encode_content(&stored.text),
            sha: stored.sha,
        }))
    }

    async fn put_content(&self, update: &FileUpdate) -> Result<()> {
        if let Some(msg) = self.error_on_put.lock().unwrap().as_ref() {
            return Err(Error::Remote(msg.clone()));
        }

        let branch_name = update.branch.as_deref().unwrap_or(DEFAULT_BRANCH);
        let text = decode_content(&update.content)?;
        let sha = self.fresh_sha();

        let mut branches = self.branches.lock().unwrap();
        let branch = branches
            .get_mut(branch_name)
            .ok_or_else(|| Error::NotFound(format!("branch {branch_name}")))?;
        let current = branch
            .files
            .get_mut(&update.path)
            .ok_or_else(|| Error::NotFound(update.path.clone()))?;
        if current.sha != update.sha {
            return Err(Error::Conflict {
                path: update.path.clone(),
            });
        }
        current.text = text.clone();
        current.sha = sha.clone();
        branch.head = format!("commit-{sha}");

        self.write_calls.lock().unwrap().push(WriteCall {
            path: update.path.clone(),
            branch: branch_name.to_string(),
            message: update.message.clone(),
            text,
        });
        Ok(())
    }

    async fn get_ref(&self, git_ref: &str) -> Result<String> {
        let name = git_ref.strip_prefix("heads/").unwrap_or(git_ref);
        self.branches
            .lock()
            .unwrap()
            .get(name)
            .map(|b| b.head.clone())
            .ok_or_else(|| Error::NotFound(git_ref.to_string()))
    }

    async fn create_ref(&self, git_ref: &str, sha: &str) -> Result<()> {
        self.create_ref_calls.lock().unwrap().push(CreateRefCall {
            git_ref: git_ref.to_string(),
            sha: sha.to_string(),
        });

        if let Some(msg) = self.error_on_create_ref.lock().unwrap().as_ref() {
            return Err(Error::Remote(msg.clone()));
        }

        let name = git_ref
            .strip_prefix("refs/heads/")
            .ok_or_else(|| Error::Remote(format!("unsupported ref {git_ref}")))?;
        let mut branches = self.branches.lock().unwrap();
        if branches.contains_key(name) {
            return Err(Error::Remote("Reference already exists".to_string()));
        }
        let source = branches
            .values()
            .find(|b| b.head == sha)
            .cloned()
            .ok_or_else(|| Error::Remote(format!("unknown commit {sha}")))?;
        branches.insert(name.to_string(), source);
        Ok(())
    }

    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequest> {
        self.create_pr_calls.lock().unwrap().push(pr.clone());

        if let Some(msg) = self.error_on_create_pr.lock().unwrap().as_ref() {
            return Err(Error::Remote(msg.clone()));
        }

        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        Ok(PullRequest {
            number,
            html_url: format!("https://github.com/acme/k8s/pull/{number}"),
        })
    }

    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()> {
        self.review_calls.lock().unwrap().push(ReviewCall {
            number,
            reviewers: reviewers.to_vec(),
        });

        if let Some(msg) = self.error_on_review.lock().unwrap().as_ref() {
            return Err(Error::Remote(msg.clone()));
        }
        Ok(())
    }

    fn config(&self) -> &RepoConfig {
        &self.config
    }
}

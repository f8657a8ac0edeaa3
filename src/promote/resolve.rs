//! Phase 1: environment discovery
//!
//! Environments are the subdirectories of `services/<service>/` in the
//! GitOps repository, minus the shared `base` template.

use crate::error::{Error, Result};
use crate::gateway::RepoGateway;
use crate::types::{EntryKind, Environment, RemoteContent};
use tracing::debug;

/// Directory holding the shared kustomize base, never an environment
pub const BASE_DIR: &str = "base";

/// Manifest file patched in every environment
pub const MANIFEST_FILE: &str = "kustomization.yaml";

/// Directory holding a service's environments
pub fn service_path(service: &str) -> String {
    format!("services/{service}")
}

/// Manifest path for one environment of a service
pub fn manifest_path(service: &str, environment: &str) -> String {
    format!("services/{service}/{environment}/{MANIFEST_FILE}")
}

/// List the environments of `service`, in remote listing order
///
/// `skip` drops one environment by name.
pub async fn list_environments(
    gateway: &dyn RepoGateway,
    service: &str,
    skip: Option<&str>,
) -> Result<Vec<Environment>> {
    let path = service_path(service);
    let entries = match gateway.get_content(&path, None).await? {
        RemoteContent::Directory(entries) => entries,
        RemoteContent::File(_) => {
            return Err(Error::NotFound(format!("{path} is a file, not a directory")));
        }
    };

    let environments: Vec<Environment> = entries
        .into_iter()
        .filter(|entry| entry.kind == EntryKind::Dir)
        .filter(|entry| entry.name != BASE_DIR)
        .filter(|entry| skip.is_none_or(|skip| entry.name != skip))
        .map(|entry| Environment::new(entry.name))
        .collect();

    debug!(
        service,
        count = environments.len(),
        "resolved environments"
    );
    Ok(environments)
}

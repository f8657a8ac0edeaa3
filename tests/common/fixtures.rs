//! Test data factories for gitops-promote types
//!
//! These are test utilities - not all are used by every test binary.

#![allow(dead_code)]

use crate::common::MockGateway;
use gitops_promote::promote::{PromotionRequest, manifest_path, service_path};
use gitops_promote::types::{DirEntry, EntryKind, ImagePin};

pub const SERVICE: &str = "api";
pub const IMAGE: &str = "app-image";
pub const GIT_SHA: &str = "0123456789abcdef0123456789abcdef01234567";
pub const SHORT_SHA: &str = "0123456";

/// A directory entry under the service folder
pub fn make_dir(name: &str) -> DirEntry {
    DirEntry {
        name: name.to_string(),
        path: format!("{}/{name}", service_path(SERVICE)),
        kind: EntryKind::Dir,
    }
}

/// A plain file entry under the service folder
pub fn make_file_entry(name: &str) -> DirEntry {
    DirEntry {
        kind: EntryKind::File,
        ..make_dir(name)
    }
}

/// A kustomization pinning `IMAGE` to `tag`
pub fn kustomization(tag: &str) -> String {
    format!(
        "apiVersion: kustomize.config.k8s.io/v1beta1\n\
         kind: Kustomization\n\
         resources:\n\
         - ../base\n\
         images:\n\
         - name: {IMAGE}\n  newTag: {tag}\n"
    )
}

/// A promotion of `IMAGE` at `GIT_SHA`
pub fn make_request(username: Option<&str>) -> PromotionRequest {
    PromotionRequest {
        service: SERVICE.to_string(),
        pin: ImagePin::new(IMAGE, GIT_SHA),
        git_sha: GIT_SHA.to_string(),
        username: username.map(str::to_string),
    }
}

/// A gateway whose service has the given environments, each pinned to `old`
///
/// `base` is listed too when present in `environments`, but gets no manifest.
pub fn make_repo(environments: &[&str]) -> MockGateway {
    let gateway = MockGateway::new();
    gateway.add_listing(
        &service_path(SERVICE),
        environments.iter().map(|name| make_dir(name)).collect(),
    );
    for env in environments.iter().filter(|env| **env != "base") {
        gateway.add_file(&manifest_path(SERVICE, env), &kustomization("old"));
    }
    gateway
}

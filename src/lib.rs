//! gitops-promote - promote a freshly built image through GitOps manifests
//!
//! Pins a new image tag in every environment of a service in a separate
//! GitOps repository. Direct environments get a commit on `master`; gated
//! environments (production) get a branch and a pull request for review.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod manifest;
pub mod promote;
pub mod types;

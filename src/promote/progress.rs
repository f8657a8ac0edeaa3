//! Progress callback trait for interface-agnostic updates
//!
//! The CLI prints these; tests record or ignore them.

use crate::error::Error;
use crate::promote::UnitState;
use crate::types::PullRequest;
use async_trait::async_trait;

/// Promotion phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Listing the service's environments
    Resolving,
    /// Ordering environments and naming branches
    Planning,
    /// Writing manifests and opening pull requests
    Promoting,
    /// Promotion complete
    Complete,
}

/// Progress callback trait
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when entering a new phase
    async fn on_phase(&self, phase: Phase);

    /// Called after an environment's unit moves to a new state
    async fn on_unit_state(&self, environment: &str, state: UnitState);

    /// Called when a pull request is opened
    async fn on_pr_created(&self, environment: &str, pr: &PullRequest);

    /// Called with the error that aborts the run
    async fn on_error(&self, error: &Error);

    /// Called with a general status message
    async fn on_message(&self, message: &str);
}

/// No-op progress callback for testing or when progress isn't needed
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_phase(&self, _phase: Phase) {}
    async fn on_unit_state(&self, _environment: &str, _state: UnitState) {}
    async fn on_pr_created(&self, _environment: &str, _pr: &PullRequest) {}
    async fn on_error(&self, _error: &Error) {}
    async fn on_message(&self, _message: &str) {}
}

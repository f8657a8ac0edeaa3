//! Progress callback that records everything it is told

#![allow(dead_code)]

use async_trait::async_trait;
use gitops_promote::error::Error;
use gitops_promote::promote::{Phase, ProgressCallback, UnitState};
use gitops_promote::types::PullRequest;
use std::sync::Mutex;

/// Records phases, unit transitions, PRs, errors and messages
#[derive(Default)]
pub struct RecordingProgress {
    phases: Mutex<Vec<Phase>>,
    states: Mutex<Vec<(String, UnitState)>>,
    prs: Mutex<Vec<(String, u64)>>,
    errors: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn phases(&self) -> Vec<Phase> {
        self.phases.lock().unwrap().clone()
    }

    /// Transitions of one environment, in order
    pub fn states_of(&self, environment: &str) -> Vec<UnitState> {
        self.states
            .lock()
            .unwrap()
            .iter()
            .filter(|(env, _)| env == environment)
            .map(|(_, state)| *state)
            .collect()
    }

    pub fn prs(&self) -> Vec<(String, u64)> {
        self.prs.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_phase(&self, phase: Phase) {
        self.phases.lock().unwrap().push(phase);
    }

    async fn on_unit_state(&self, environment: &str, state: UnitState) {
        self.states
            .lock()
            .unwrap()
            .push((environment.to_string(), state));
    }

    async fn on_pr_created(&self, environment: &str, pr: &PullRequest) {
        self.prs
            .lock()
            .unwrap()
            .push((environment.to_string(), pr.number));
    }

    async fn on_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    async fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

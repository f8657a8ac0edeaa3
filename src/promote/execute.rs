//! Phase 3: promotion execution
//!
//! Runs the units of a plan one after another. The first failure marks its
//! unit `Failed` and aborts the run; units already finished stay committed.

use crate::error::{Error, Result};
use crate::gateway::RepoGateway;
use crate::manifest::{self, PatchResult};
use crate::promote::plan::BASE_BRANCH;
use crate::promote::{Phase, ProgressCallback, PromotionPlan, PromotionUnit, UnitState};
use crate::types::{FileUpdate, ImagePin, PullRequest, RemoteContent, RemoteFile, Strategy};
use tracing::{debug, info};

/// Outcome of a promotion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionReport {
    /// Every unit with its final state
    pub units: Vec<PromotionUnit>,
    /// Whether the run only reported the plan
    pub dry_run: bool,
}

impl PromotionReport {
    /// Pull requests opened during the run
    pub fn pull_requests(&self) -> impl Iterator<Item = &PullRequest> {
        self.units.iter().filter_map(|unit| unit.opened.as_ref())
    }

    /// Number of units that produced a commit
    pub fn committed(&self) -> usize {
        self.units
            .iter()
            .filter(|unit| unit.state == UnitState::Done)
            .count()
    }
}

/// Execute a promotion plan
///
/// Unit states are updated in `plan` as the run progresses, so they stay
/// inspectable when an error is returned.
pub async fn execute_promotion(
    plan: &mut PromotionPlan,
    gateway: &dyn RepoGateway,
    progress: &dyn ProgressCallback,
    dry_run: bool,
) -> Result<PromotionReport> {
    if dry_run {
        progress.on_message("Dry run - no changes will be made").await;
        report_dry_run(plan, progress).await;
        return Ok(PromotionReport {
            units: plan.units.clone(),
            dry_run,
        });
    }

    progress.on_phase(Phase::Promoting).await;

    let PromotionPlan { request, units } = &mut *plan;
    for unit in units.iter_mut() {
        info!(environment = %unit.environment, strategy = %unit.strategy, "promoting");
        let outcome = if unit.strategy == Strategy::Gated {
            promote_gated(unit, &request.pin, request.username.as_deref(), gateway, progress).await
        } else {
            promote_direct(unit, &request.pin, gateway, progress).await
        };

        if let Err(e) = outcome {
            advance(unit, UnitState::Failed, progress).await;
            progress.on_error(&e).await;
            return Err(e);
        }
    }

    progress.on_phase(Phase::Complete).await;

    Ok(PromotionReport {
        units: plan.units.clone(),
        dry_run,
    })
}

async fn advance(unit: &mut PromotionUnit, state: UnitState, progress: &dyn ProgressCallback) {
    debug!(environment = %unit.environment, from = %unit.state, to = %state, "unit transition");
    unit.state = state;
    progress.on_unit_state(&unit.environment.name, state).await;
}

/// Commit the patched manifest straight to the base branch
async fn promote_direct(
    unit: &mut PromotionUnit,
    pin: &ImagePin,
    gateway: &dyn RepoGateway,
    progress: &dyn ProgressCallback,
) -> Result<()> {
    let Some(patch) = read_and_patch(unit, pin, gateway, progress).await? else {
        return Ok(());
    };
    commit(unit, &patch, gateway, progress).await?;
    advance(unit, UnitState::Done, progress).await;
    Ok(())
}

/// Commit the patched manifest to a fresh branch and open a pull request
async fn promote_gated(
    unit: &mut PromotionUnit,
    pin: &ImagePin,
    reviewer: Option<&str>,
    gateway: &dyn RepoGateway,
    progress: &dyn ProgressCallback,
) -> Result<()> {
    let Some(new_pr) = unit.pull_request.clone() else {
        return Err(Error::Internal(format!(
            "gated unit for {} has no pull request",
            unit.environment
        )));
    };

    // The branch starts at master's tip, so master's manifest decides whether
    // there is anything to propose.
    let current = read_manifest(gateway, &unit.path, BASE_BRANCH).await?;
    if !manifest::patch_file(&current, pin)?.changed {
        advance(unit, UnitState::Read, progress).await;
        advance(unit, UnitState::Patched, progress).await;
        mark_up_to_date(unit, pin, progress).await;
        return Ok(());
    }

    let base_sha = gateway.get_ref(&format!("heads/{BASE_BRANCH}")).await?;
    gateway
        .create_ref(&format!("refs/heads/{}", unit.branch), &base_sha)
        .await?;
    advance(unit, UnitState::BranchCreated, progress).await;

    let Some(patch) = read_and_patch(unit, pin, gateway, progress).await? else {
        progress
            .on_message(&format!(
                "Branch {} left without a pull request",
                unit.branch
            ))
            .await;
        return Ok(());
    };
    commit(unit, &patch, gateway, progress).await?;

    let pr = gateway.create_pull_request(&new_pr).await?;
    progress.on_pr_created(&unit.environment.name, &pr).await;
    let number = pr.number;
    unit.opened = Some(pr);
    advance(unit, UnitState::PullRequestOpened, progress).await;

    if let Some(reviewer) = reviewer {
        gateway
            .request_reviewers(number, &[reviewer.to_string()])
            .await?;
        advance(unit, UnitState::ReviewerRequested, progress).await;
    }

    advance(unit, UnitState::Done, progress).await;
    Ok(())
}

/// Read and patch the unit's manifest on its branch
///
/// Returns `None`, with the unit marked `UpToDate`, when there is nothing to
/// write.
async fn read_and_patch(
    unit: &mut PromotionUnit,
    pin: &ImagePin,
    gateway: &dyn RepoGateway,
    progress: &dyn ProgressCallback,
) -> Result<Option<PatchResult>> {
    let file = read_manifest(gateway, &unit.path, &unit.branch).await?;
    advance(unit, UnitState::Read, progress).await;

    let patch = manifest::patch_file(&file, pin)?;
    advance(unit, UnitState::Patched, progress).await;

    if patch.changed {
        Ok(Some(patch))
    } else {
        mark_up_to_date(unit, pin, progress).await;
        Ok(None)
    }
}

async fn mark_up_to_date(unit: &mut PromotionUnit, pin: &ImagePin, progress: &dyn ProgressCallback) {
    progress
        .on_message(&format!(
            "{} already pins {} to {}",
            unit.environment, pin.name, pin.new_tag
        ))
        .await;
    advance(unit, UnitState::UpToDate, progress).await;
}

async fn read_manifest(gateway: &dyn RepoGateway, path: &str, branch: &str) -> Result<RemoteFile> {
    match gateway.get_content(path, Some(branch)).await? {
        RemoteContent::File(file) => Ok(file),
        RemoteContent::Directory(_) => Err(Error::NotFound(format!(
            "{path} is a directory, not a manifest"
        ))),
    }
}

async fn commit(
    unit: &mut PromotionUnit,
    patch: &PatchResult,
    gateway: &dyn RepoGateway,
    progress: &dyn ProgressCallback,
) -> Result<()> {
    gateway
        .put_content(&FileUpdate {
            path: patch.path.clone(),
            message: unit.message.clone(),
            content: patch.content.clone(),
            sha: patch.sha.clone(),
            branch: Some(unit.branch.clone()),
        })
        .await?;
    advance(unit, UnitState::Committed, progress).await;
    Ok(())
}

/// Report what would be done in a dry run
async fn report_dry_run(plan: &PromotionPlan, progress: &dyn ProgressCallback) {
    if plan.is_empty() {
        progress.on_message("Nothing to do - no environments found").await;
        return;
    }

    let pin = &plan.request.pin;
    progress
        .on_message(&format!("Would pin {} to {}:", pin.name, pin.new_tag))
        .await;
    for unit in &plan.units {
        let line = match &unit.pull_request {
            None => format!("  - {} → commit {} on {}", unit.environment, unit.path, unit.branch),
            Some(pr) => format!(
                "  - {} → branch {}, pull request \"{}\" into {}",
                unit.environment, unit.branch, pr.title, pr.base
            ),
        };
        progress.on_message(&line).await;
    }
}

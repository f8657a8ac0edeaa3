//! Three-phase promotion engine
//!
//! 1. Resolving - list the service's environments in the GitOps repository
//! 2. Planning - order them, direct environments first, and name branches
//! 3. Execution - patch each manifest, committing directly or through a
//!    pull request

mod execute;
mod plan;
mod progress;
mod resolve;

pub use execute::{PromotionReport, execute_promotion};
pub use plan::{
    BASE_BRANCH, PR_BODY, PromotionPlan, PromotionRequest, PromotionUnit, UnitState,
    commit_message, create_promotion_plan, generate_branch_name, order_environments,
    pull_request_title,
};
pub use progress::{NoopProgress, Phase, ProgressCallback};
pub use resolve::{BASE_DIR, MANIFEST_FILE, list_environments, manifest_path, service_path};

use crate::error::Result;
use crate::gateway::RepoGateway;
use tracing::info;

/// Resolve, plan and execute a promotion
pub async fn run_promotion(
    request: PromotionRequest,
    skip_environment: Option<&str>,
    gateway: &dyn RepoGateway,
    progress: &dyn ProgressCallback,
    dry_run: bool,
) -> Result<PromotionReport> {
    progress.on_phase(Phase::Resolving).await;
    let repo = gateway.config();
    info!(
        owner = %repo.owner,
        repo = %repo.repo,
        service = %request.service,
        "resolving environments"
    );
    let environments = match list_environments(gateway, &request.service, skip_environment).await
    {
        Ok(environments) => environments,
        Err(e) => {
            progress.on_error(&e).await;
            return Err(e);
        }
    };

    progress.on_phase(Phase::Planning).await;
    let mut plan = create_promotion_plan(request, environments);
    if plan.is_empty() && !dry_run {
        progress.on_message("Nothing to do - no environments found").await;
        progress.on_phase(Phase::Complete).await;
        return Ok(PromotionReport {
            units: Vec::new(),
            dry_run,
        });
    }

    execute_promotion(&mut plan, gateway, progress, dry_run).await
}

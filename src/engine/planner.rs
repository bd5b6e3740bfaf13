//! Execution planner - builds the task plan from config

use anyhow::{Context as _, Result, bail};
use declarative::ExecutionPlan;
use iamkit::Client;
use std::path::Path;

use crate::config::CloudupConfig;

/// Build a plan holding one task per configured role policy
///
/// `target` narrows the plan to a kind (`role_policy`) or a single
/// `kind.name`. A target that matches nothing is an error.
pub fn build_plan(
    config: &CloudupConfig,
    base_dir: &Path,
    target: Option<&str>,
) -> Result<ExecutionPlan<Client>> {
    let mut plan: ExecutionPlan<Client> = ExecutionPlan::new();
    for task in config.tasks(base_dir)? {
        let name = task.name.clone();
        plan.add(Box::new(task))
            .with_context(|| format!("Could not plan role policy '{name}'"))?;
    }

    let total = plan.len();
    let plan = plan.filter_by_target(target);
    if let Some(target) = target
        && plan.is_empty()
        && total > 0
    {
        bail!("No resources match target '{target}'");
    }

    log::debug!("Planned {} of {} tasks", plan.len(), total);
    Ok(plan)
}

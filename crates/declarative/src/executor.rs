//! Execution engine - previews and applies plans with parallelism

use crate::context::{ConfirmCallback, Context, Reporter};
use crate::diff::Preview;
use crate::handle::ResourceKey;
use crate::iac::IacTarget;
use crate::planner::ExecutionPlan;
use crate::task::{Backend, BoxedTask, Outcome};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use rayon::prelude::*;

/// Discover every task in the plan and describe what apply would do
pub fn preview_plan<C: ?Sized + Sync>(plan: &ExecutionPlan<C>, cloud: &C) -> Preview {
    let ctx = Context::dry_run(cloud);
    let mut preview = Preview::default();

    for task in plan.tasks() {
        match task.preview(&ctx) {
            Ok(diff) => preview.diffs.push(diff),
            Err(e) => preview.errors.push((task.resource_key(), e)),
        }
    }

    preview
}

/// Preview, confirm and apply a plan against the live provider
///
/// Returns without applying when nothing would change, when the user declines,
/// or in dry-run mode.
pub fn execute_live<C, R, K>(
    plan: &ExecutionPlan<C>,
    opts: &ExecuteOptions,
    cloud: &C,
    reporter: &R,
    confirm: &mut K,
) -> std::io::Result<ExecuteSummary>
where
    C: ?Sized + Sync,
    R: Reporter,
    K: ConfirmCallback,
{
    let preview = preview_plan(plan, cloud);
    reporter.on_preview(&preview);

    if preview.is_converged() {
        let mut summary = ExecuteSummary::default();
        for diff in &preview.diffs {
            summary.add_result(&ApplyResult::NoChange);
            if let Some(id) = &diff.id {
                summary.resolved_ids.insert(diff.key.to_string(), id.clone());
            }
        }
        return Ok(summary);
    }

    let pending = preview.changes().count() + preview.errors.len();

    if opts.dry_run {
        return Ok(ExecuteSummary {
            skipped: pending,
            ..Default::default()
        });
    }

    if !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: pending,
            ..Default::default()
        });
    }

    Ok(apply_plan(plan, opts.jobs, cloud, reporter))
}

/// Apply every task in the plan against the live provider
///
/// A failing task is recorded as failed and does not stop its siblings.
pub fn apply_plan<C, R>(plan: &ExecutionPlan<C>, jobs: usize, cloud: &C, reporter: &R) -> ExecuteSummary
where
    C: ?Sized + Sync,
    R: Reporter,
{
    let tasks = plan.tasks();
    let run_one = |task: &BoxedTask<C>| {
        let key = task.resource_key();
        reporter.on_resource_start(&key);
        let outcome = task.run(Backend::Live(Context::new(cloud)), reporter);
        finish(key, outcome, reporter)
    };

    let results: Vec<_> = if jobs <= 1 || tasks.len() <= 1 {
        tasks.iter().map(run_one).collect()
    } else {
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(|| tasks.par_iter().map(run_one).collect()),
            Err(e) => {
                log::warn!("Failed to create apply thread pool ({e}), applying sequentially");
                tasks.iter().map(run_one).collect()
            }
        }
    };

    summarize(results)
}

/// Declare every task in the plan on an IaC target
pub fn execute_iac<C, R>(
    plan: &ExecutionPlan<C>,
    target: &mut dyn IacTarget,
    reporter: &R,
) -> ExecuteSummary
where
    C: ?Sized,
    R: Reporter,
{
    let mut results = Vec::with_capacity(plan.len());
    for task in plan.tasks() {
        let key = task.resource_key();
        reporter.on_resource_start(&key);
        let outcome = task.run(Backend::Iac(&mut *target), reporter);
        results.push(finish(key, outcome, reporter));
    }
    summarize(results)
}

fn finish<R: Reporter + ?Sized>(
    key: ResourceKey,
    outcome: crate::error::Result<Outcome>,
    reporter: &R,
) -> (ResourceKey, Outcome) {
    let outcome = outcome.unwrap_or_else(|e| Outcome {
        result: ApplyResult::Failed {
            error: format!("{} failed: {e}", e.phase()),
        },
        id: None,
    });
    reporter.on_resource_complete(&key, &outcome.result);
    (key, outcome)
}

fn summarize(results: Vec<(ResourceKey, Outcome)>) -> ExecuteSummary {
    let mut summary = ExecuteSummary::default();
    for (key, outcome) in results {
        summary.add_result(&outcome.result);
        if let ApplyResult::Failed { error } = &outcome.result {
            summary.errors.insert(key.to_string(), error.clone());
        }
        if let Some(id) = outcome.id {
            summary.resolved_ids.insert(key.to_string(), id);
        }
    }
    summary
}

//! `cloudup apply` - make AWS match the config

use anyhow::{Result, bail};

use crate::Context;
use crate::engine::{ExecuteOptions, build_plan, execute};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool, jobs: usize) -> Result<()> {
    let loaded = super::load(ctx)?;
    let plan = build_plan(&loaded.config, &loaded.base_dir, target)?;
    if plan.is_empty() {
        ui::info("No role policies configured");
        return Ok(());
    }

    let client = super::client(&loaded.config)?;
    let opts = ExecuteOptions {
        dry_run,
        jobs,
        yes,
        quiet: ctx.quiet,
    };
    let summary = execute(&plan, &opts, &client)?;

    for (key, id) in &summary.resolved_ids {
        log::debug!("{key} => {id}");
    }

    if !summary.is_success() {
        bail!("{} of {} role policies failed", summary.failed, summary.total());
    }
    Ok(())
}

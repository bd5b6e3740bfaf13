//! `cloudup plan` - show what apply would change

use anyhow::{Result, bail};
use declarative::preview_plan;

use crate::Context;
use crate::engine::{build_plan, differ};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let loaded = super::load(ctx)?;
    let plan = build_plan(&loaded.config, &loaded.base_dir, target)?;
    if plan.is_empty() {
        ui::info("No role policies configured");
        return Ok(());
    }

    let client = super::client(&loaded.config)?;
    let preview = preview_plan(&plan, &client);
    differ::display_preview(&preview);

    if !preview.errors.is_empty() {
        bail!(
            "Could not plan {} of {} resources",
            preview.errors.len(),
            plan.len()
        );
    }
    Ok(())
}

//! `cloudup render` - write the config as Terraform JSON

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{LogReporter, execute_iac};
use std::path::Path;

use crate::Context;
use crate::engine::build_plan;
use crate::terraform::TerraformTarget;
use crate::ui;

pub fn run(ctx: &Context, out: &Path, target: Option<&str>) -> Result<()> {
    let loaded = super::load(ctx)?;
    let plan = build_plan(&loaded.config, &loaded.base_dir, target)?;

    let mut terraform = TerraformTarget::new();
    let summary = execute_iac(&plan, &mut terraform, &LogReporter);
    if !summary.is_success() {
        for (key, error) in &summary.errors {
            ui::error(&format!("{key}: {error}"));
        }
        bail!("{} of {} resources could not be rendered", summary.failed, summary.total());
    }

    if terraform.is_empty() {
        ui::info("No role policies configured");
        return Ok(());
    }
    let written = terraform.write_to(out)?;

    if !ctx.quiet {
        ui::success(&format!(
            "Rendered {} resources to {}",
            terraform.len(),
            out.display()
        ));
        for path in &written {
            println!("    {}", ui::truncate_path(&path.display().to_string(), 70).dimmed());
        }
    }
    Ok(())
}

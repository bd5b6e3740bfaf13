//! Execution engine - cloudup executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{AutoConfirm, ConfirmCallback, ExecuteSummary, ExecutionPlan, execute_live};
use iamkit::Client;

use crate::progress::ProgressReporter;

/// Options for execution (cloudup-specific, includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Suppress the plan display and progress bar
    pub quiet: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            quiet: false,
        }
    }
}

impl ExecuteOptions {
    fn declarative(&self) -> declarative::ExecuteOptions {
        declarative::ExecuteOptions {
            dry_run: self.dry_run,
            jobs: self.jobs.max(1),
        }
    }
}

/// Terminal confirmation prompt
struct DialoguerConfirm;

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(std::io::Error::other)
    }
}

/// Preview, confirm and apply the plan against AWS
pub fn execute(
    plan: &ExecutionPlan<Client>,
    opts: &ExecuteOptions,
    client: &Client,
) -> Result<ExecuteSummary> {
    let reporter = ProgressReporter::new(opts.quiet);

    let summary = if opts.yes || opts.dry_run {
        execute_live(plan, &opts.declarative(), client, &reporter, &mut AutoConfirm)?
    } else {
        execute_live(plan, &opts.declarative(), client, &reporter, &mut DialoguerConfirm)?
    };
    reporter.finish();

    if !opts.quiet {
        print_summary(&summary, opts.dry_run);
    }

    Ok(summary)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    if summary.total_changes() == 0 && summary.skipped == 0 && summary.failed == 0 {
        return;
    }

    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return;
    }
    if summary.total_changes() == 0 && summary.failed == 0 {
        println!("  {} Aborted", "✗".red());
        return;
    }

    if summary.is_success() {
        println!("  {} Policies applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Policies applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} policies created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} policies updated", summary.modified);
    }
    if summary.skipped > 0 {
        println!("    • {} policies skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "policies".red());
        for (key, error) in &summary.errors {
            println!("      {} {}: {}", "✗".red(), key, error.dimmed());
        }
    }
}

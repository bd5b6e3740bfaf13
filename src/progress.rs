//! Progress indicators for cloudup.

use colored::Colorize;
use declarative::{ApplyResult, LogReporter, Preview, Reporter, ResourceKey};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::differ;

/// Create a progress bar with the standard cloudup style
pub fn bar(len: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::hidden());
    let style = ProgressStyle::default_bar()
        .template("{prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb
}

/// Reporter that shows the plan, then a progress bar while applying
pub struct ProgressReporter {
    bar: ProgressBar,
    quiet: bool,
    started: AtomicBool,
}

impl ProgressReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: bar(0, "Applying"),
            quiet,
            started: AtomicBool::new(false),
        }
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Reporter for ProgressReporter {
    fn on_preview(&self, preview: &Preview) {
        self.bar
            .set_length((preview.diffs.len() + preview.errors.len()) as u64);
        if !self.quiet {
            differ::display_preview(preview);
        }
    }

    fn on_resource_start(&self, key: &ResourceKey) {
        if !self.quiet && !self.started.swap(true, Ordering::SeqCst) {
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        self.bar.set_message(key.to_string());
    }

    fn on_resource_complete(&self, key: &ResourceKey, result: &ApplyResult) {
        let symbol = match result {
            ApplyResult::NoChange => "○".dimmed(),
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Declared => "✓".green(),
            ApplyResult::Failed { .. } => "✗".red(),
            ApplyResult::Skipped { .. } => "⊘".yellow(),
        };
        if let ApplyResult::Failed { error } = result {
            self.bar.println(format!("  {symbol} {key}: {error}"));
        }
        self.bar.set_message(format!("{symbol} {key}"));
        self.bar.inc(1);
    }

    fn on_field_changed(&self, key: &ResourceKey, field: &str, before: &str, after: &str) {
        self.bar
            .suspend(|| LogReporter.on_field_changed(key, field, before, after));
    }

    fn on_field_unchanged(&self, key: &ResourceKey, field: &str) {
        self.bar.suspend(|| LogReporter.on_field_unchanged(key, field));
    }
}

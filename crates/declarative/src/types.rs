//! Core types for task reconciliation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal state of one task in one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Actual state already matched
    NoChange,
    /// Resource was created
    Created,
    /// Resource was updated in place
    Modified,
    /// Resource was written to an IaC target
    Declared,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Declared)
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoChange => "unchanged",
            Self::Created => "created",
            Self::Modified => "updated",
            Self::Declared => "declared",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub declared: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
    /// Provider identifiers learned during discovery, by resource key
    #[serde(default)]
    pub resolved_ids: BTreeMap<String, String>,
    /// Failure messages, by resource key
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.declared
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of tasks processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.declared + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.declared += other.declared;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
        self.resolved_ids
            .extend(other.resolved_ids.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.errors
            .extend(other.errors.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Declared => self.declared += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs for live apply
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}

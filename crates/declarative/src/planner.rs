//! Execution planner - builds task execution plans

use crate::error::{Error, Result};
use crate::handle::ResourceKey;
use crate::task::{BoxedTask, Reconcile};
use std::collections::BTreeSet;
use std::fmt;

/// An ordered set of independent tasks sharing one provider client
///
/// A plan holds at most one task per resource key, so no two workers ever
/// reconcile the same resource concurrently.
pub struct ExecutionPlan<C: ?Sized> {
    tasks: Vec<BoxedTask<C>>,
    keys: BTreeSet<ResourceKey>,
}

impl<C: ?Sized> ExecutionPlan<C> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            keys: BTreeSet::new(),
        }
    }

    /// Add a task, rejecting a second task for the same key
    pub fn add(&mut self, task: BoxedTask<C>) -> Result<()> {
        let key = task.resource_key();
        if !self.keys.insert(key.clone()) {
            return Err(Error::DuplicateKey(key));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Tasks in insertion order
    pub fn tasks(&self) -> &[BoxedTask<C>] {
        &self.tasks
    }

    /// Filter plan to only include tasks matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Reconcile<C>) -> bool,
    {
        let tasks: Vec<_> = self
            .tasks
            .into_iter()
            .filter(|t| predicate(t.as_ref()))
            .collect();
        let keys = tasks.iter().map(|t| t.resource_key()).collect();
        Self { tasks, keys }
    }

    /// Filter plan to only include tasks matching a target pattern
    ///
    /// Target format: "kind" or "kind.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|task| matches_filter(&task.resource_key(), kind.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of tasks in the plan
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<C: ?Sized> fmt::Debug for ExecutionPlan<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("tasks", &self.keys)
            .finish()
    }
}

impl<C: ?Sized> Default for ExecutionPlan<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "kind.name" into (kind, name)
///
/// Resource names may themselves contain dots, so only the first dot splits.
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) => (Some(kind.to_string()), Some(name.to_string())),
    }
}

/// Check if a task key matches the filter criteria
fn matches_filter(key: &ResourceKey, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind {
        // Allow common aliases
        let matches_kind = match k {
            "policies" | "role_policy" => key.kind == "aws_iam_role_policy",
            _ => key.kind == k || key.kind.starts_with(k),
        };
        if !matches_kind {
            return false;
        }
    }

    if let Some(n) = name
        && key.name != n
    {
        return false;
    }

    true
}

//! Reconciliation context and observer traits
//!
//! These traits keep the framework free of UI and logging decisions:
//! callers inject how progress, diffs and confirmations are surfaced.

use crate::diff::{Preview, text_diff};
use crate::handle::ResourceKey;
use crate::types::ApplyResult;
use std::sync::Mutex;

/// Context passed to discovery
pub struct Context<'a, C: ?Sized> {
    /// Provider client
    pub cloud: &'a C,
    /// Whether this pass only previews changes
    pub dry_run: bool,
}

impl<'a, C: ?Sized> Context<'a, C> {
    /// Create a context for a live pass
    pub fn new(cloud: &'a C) -> Self {
        Self {
            cloud,
            dry_run: false,
        }
    }

    /// Create a context for a preview pass
    pub fn dry_run(cloud: &'a C) -> Self {
        Self {
            cloud,
            dry_run: true,
        }
    }
}

impl<C: ?Sized> Clone for Context<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized> Copy for Context<'_, C> {}

/// Observer for reconciliation events
///
/// Methods take `&self` so one reporter can be shared by parallel workers.
pub trait Reporter: Send + Sync {
    /// Called once a plan has been discovered, before anything is applied
    fn on_preview(&self, _preview: &Preview) {}

    /// Called when a task starts
    fn on_resource_start(&self, _key: &ResourceKey) {}

    /// Called when a task reaches a terminal state
    fn on_resource_complete(&self, _key: &ResourceKey, _result: &ApplyResult) {}

    /// Called before a changed field is written, with its old and new text
    fn on_field_changed(&self, key: &ResourceKey, field: &str, before: &str, after: &str);

    /// Called when a field flagged as changed turns out to be identical
    fn on_field_unchanged(&self, key: &ResourceKey, field: &str);
}

/// Reporter that writes to the `log` facade
pub struct LogReporter;

impl Reporter for LogReporter {
    fn on_resource_start(&self, key: &ResourceKey) {
        log::debug!("Reconciling {key}");
    }

    fn on_resource_complete(&self, key: &ResourceKey, result: &ApplyResult) {
        match result {
            ApplyResult::Failed { error } => log::error!("{key}: {error}"),
            other => log::debug!("{key}: {}", other.label()),
        }
    }

    fn on_field_changed(&self, key: &ResourceKey, field: &str, before: &str, after: &str) {
        log::info!("Applying changed {field} to {key}:\n{}", text_diff(before, after));
    }

    fn on_field_unchanged(&self, key: &ResourceKey, field: &str) {
        log::warn!("{key}: {field} was flagged as changed but is actually the same");
    }
}

/// Reporter that discards everything
pub struct NoReport;

impl Reporter for NoReport {
    fn on_field_changed(&self, _key: &ResourceKey, _field: &str, _before: &str, _after: &str) {}
    fn on_field_unchanged(&self, _key: &ResourceKey, _field: &str) {}
}

/// An event captured by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Started(ResourceKey),
    Completed(ResourceKey, ApplyResult),
    FieldChanged {
        key: ResourceKey,
        field: String,
        before: String,
        after: String,
    },
    FieldUnchanged {
        key: ResourceKey,
        field: String,
    },
}

/// Reporter that keeps every event in memory
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<ReportEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, event: ReportEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl Reporter for RecordingReporter {
    fn on_resource_start(&self, key: &ResourceKey) {
        self.push(ReportEvent::Started(key.clone()));
    }

    fn on_resource_complete(&self, key: &ResourceKey, result: &ApplyResult) {
        self.push(ReportEvent::Completed(key.clone(), result.clone()));
    }

    fn on_field_changed(&self, key: &ResourceKey, field: &str, before: &str, after: &str) {
        self.push(ReportEvent::FieldChanged {
            key: key.clone(),
            field: field.to_string(),
            before: before.to_string(),
            after: after.to_string(),
        });
    }

    fn on_field_unchanged(&self, key: &ResourceKey, field: &str) {
        self.push(ReportEvent::FieldUnchanged {
            key: key.clone(),
            field: field.to_string(),
        });
    }
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool>;
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> std::io::Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> std::io::Result<bool> {
        Ok(false)
    }
}

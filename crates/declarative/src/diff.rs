//! Plan previews and text diffs

use crate::error::Error;
use crate::handle::ResourceKey;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;

/// What a live pass would do with a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// The resource does not exist and would be created
    Create,
    /// The resource exists and would be updated
    Update,
    /// Actual state already matches
    NoOp,
}

/// Old and new text of one changed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub before: Option<String>,
    pub after: String,
}

impl FieldDiff {
    /// Line diff of this field, `None` when there is no previous value
    pub fn render(&self) -> Option<String> {
        self.before.as_deref().map(|before| text_diff(before, &self.after))
    }
}

/// A preview of one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Resource being previewed
    pub key: ResourceKey,
    /// What apply would do
    pub action: Action,
    /// Fields that differ (empty for creations and no-ops)
    pub changed_fields: Vec<String>,
    /// Old and new values of the changed fields
    pub field_diffs: Vec<FieldDiff>,
    /// Provider identifier learned during discovery
    pub id: Option<String>,
}

impl ResourceDiff {
    /// Check if this diff represents a creation
    pub fn is_addition(&self) -> bool {
        self.action == Action::Create
    }

    /// Check if this diff represents an update
    pub fn is_modification(&self) -> bool {
        self.action == Action::Update
    }

    /// Check if apply would change anything
    pub fn has_changes(&self) -> bool {
        self.action != Action::NoOp
    }
}

/// Discovery results for a whole plan
#[derive(Debug, Default)]
pub struct Preview {
    /// One diff per task whose discovery succeeded, in plan order
    pub diffs: Vec<ResourceDiff>,
    /// Tasks whose discovery failed
    pub errors: Vec<(ResourceKey, Error)>,
}

impl Preview {
    /// Diffs that would change something
    pub fn changes(&self) -> impl Iterator<Item = &ResourceDiff> {
        self.diffs.iter().filter(|d| d.has_changes())
    }

    /// Check if a live pass would do nothing
    pub fn is_converged(&self) -> bool {
        self.errors.is_empty() && self.changes().next().is_none()
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to update
    pub modifications: usize,
    /// Number of resources already in sync
    pub unchanged: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Update => summary.modifications += 1,
                Action::NoOp => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource kind
pub fn group_by_kind(diffs: &[ResourceDiff]) -> BTreeMap<&str, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<&str, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(diff.key.kind.as_str()).or_default().push(diff);
    }
    groups
}

/// Line-based diff of two texts, `-`/`+` prefixed, unchanged lines indented.
///
/// Single-line documents (the common case for minified JSON) are shown as a
/// removed and an added line.
pub fn text_diff(before: &str, after: &str) -> String {
    let diff = TextDiff::from_lines(before, after);
    let mut out = String::new();

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        out.push(sign);
        out.push(' ');
        out.push_str(change.value());
        if change.missing_newline() {
            out.push('\n');
        }
    }

    out
}

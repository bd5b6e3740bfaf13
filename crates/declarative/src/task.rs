//! Task trait for declarative reconciliation
//!
//! A Task is one managed resource type. It knows how to discover its actual
//! state from a provider, how to express the difference from its desired state
//! as a sparse change set, and how to apply that through either backend.

use crate::changes::ChangeSet;
use crate::context::{Context, Reporter};
use crate::diff::{Action, FieldDiff, ResourceDiff};
use crate::error::Result;
use crate::handle::ResourceKey;
use crate::iac::{IacTarget, Literal};
use crate::types::ApplyResult;
use std::fmt;

/// Outcome of discovery
///
/// The identifier is returned next to the snapshot rather than written back
/// into the desired description; the executor decides what to do with it.
#[derive(Debug)]
pub struct Discovered<T> {
    /// Actual state, `None` if the resource does not exist
    pub actual: Option<T>,
    /// Provider identifier of the resource, if it exists and has one
    pub id: Option<String>,
}

impl<T> Discovered<T> {
    /// The resource does not exist
    pub fn absent() -> Self {
        Self {
            actual: None,
            id: None,
        }
    }

    /// The resource exists
    pub fn found(actual: T, id: Option<String>) -> Self {
        Self {
            actual: Some(actual),
            id,
        }
    }
}

/// Where a reconciliation pass sends its effects
///
/// Selected once per pass; each task dispatches on it exactly once.
pub enum Backend<'a, C: ?Sized> {
    /// Mutate the provider through its client
    Live(Context<'a, C>),
    /// Write declarative IaC output
    Iac(&'a mut dyn IacTarget),
}

/// Core trait for reconcilable resource types
///
/// `Self` is both the desired description (the value the caller built) and
/// the actual snapshot (the value `discover` returns).
pub trait Task: fmt::Debug + Send + Sync + Sized {
    /// Provider client used by discovery and live apply
    type Cloud: ?Sized + Sync;

    /// Sparse change set between actual and desired
    type Changes: ChangeSet + fmt::Debug + Send;

    /// Resource kind (the IaC resource type name)
    fn kind(&self) -> &'static str;

    /// Resource name
    fn name(&self) -> &str;

    /// Unique key of this resource
    fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind(), self.name())
    }

    /// Query the provider for the actual state matching this description
    fn discover(&self, ctx: &Context<'_, Self::Cloud>) -> Result<Discovered<Self>>;

    /// Compute the fields that differ between `actual` and `desired`
    fn changes(actual: &Self, desired: &Self) -> Result<Self::Changes>;

    /// Check that `desired` can be applied
    fn validate(
        _actual: Option<&Self>,
        _desired: &Self,
        _changes: Option<&Self::Changes>,
    ) -> Result<()> {
        Ok(())
    }

    /// Apply through the provider API
    fn apply_live(
        &self,
        cloud: &Self::Cloud,
        actual: Option<&Self>,
        changes: Option<&Self::Changes>,
        reporter: &dyn Reporter,
    ) -> Result<ApplyResult>;

    /// Declare this resource on an IaC target
    ///
    /// IaC output is always a full description, never a delta.
    fn apply_iac(&self, target: &mut dyn IacTarget) -> Result<()>;

    /// Symbolic reference to this resource for dependents
    fn self_link(&self) -> Literal {
        Literal::self_link(self.key())
    }

    /// Old and new values of changed fields, for previews
    fn field_diffs(
        &self,
        _actual: Option<&Self>,
        _changes: Option<&Self::Changes>,
    ) -> Result<Vec<FieldDiff>> {
        Ok(Vec::new())
    }
}

/// Result of running a task through a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Terminal state
    pub result: ApplyResult,
    /// Identifier learned during discovery
    pub id: Option<String>,
}

/// Run one task through the backend
///
/// Live: discover, compute changes when the resource exists, validate, apply.
/// IaC: declare; discovery is skipped since the output does not depend on
/// actual state.
pub fn run_task<T: Task>(
    task: &T,
    backend: Backend<'_, T::Cloud>,
    reporter: &dyn Reporter,
) -> Result<Outcome> {
    match backend {
        Backend::Live(ctx) => {
            let discovered = task.discover(&ctx)?;
            let id = discovered.id.clone();
            let result = apply_discovered(task, discovered, &ctx, reporter)?;
            Ok(Outcome { result, id })
        }
        Backend::Iac(target) => {
            task.apply_iac(target)?;
            Ok(Outcome {
                result: ApplyResult::Declared,
                id: None,
            })
        }
    }
}

/// Validate and apply a task whose actual state is already known
pub fn apply_discovered<T: Task>(
    task: &T,
    discovered: Discovered<T>,
    ctx: &Context<'_, T::Cloud>,
    reporter: &dyn Reporter,
) -> Result<ApplyResult> {
    let actual = discovered.actual.as_ref();
    let changes = actual.map(|a| T::changes(a, task)).transpose()?;

    T::validate(actual, task, changes.as_ref())?;

    if ctx.dry_run {
        return Ok(ApplyResult::Skipped {
            reason: "Dry run".to_string(),
        });
    }

    task.apply_live(ctx.cloud, actual, changes.as_ref(), reporter)
}

/// Discover a task and describe what a live pass would do
pub fn preview<T: Task>(task: &T, ctx: &Context<'_, T::Cloud>) -> Result<ResourceDiff> {
    let discovered = task.discover(ctx)?;
    let actual = discovered.actual.as_ref();
    let changes = actual.map(|a| T::changes(a, task)).transpose()?;

    let (action, changed_fields) = match &changes {
        None => (Action::Create, Vec::new()),
        Some(c) if c.is_empty() => (Action::NoOp, Vec::new()),
        Some(c) => (
            Action::Update,
            c.changed_fields().into_iter().map(str::to_string).collect(),
        ),
    };

    let field_diffs = if action == Action::NoOp {
        Vec::new()
    } else {
        task.field_diffs(actual, changes.as_ref())?
    };

    Ok(ResourceDiff {
        key: task.key(),
        action,
        changed_fields,
        field_diffs,
        id: discovered.id,
    })
}

/// Type-erased task, so plans can mix resource types sharing one client
pub trait Reconcile<C: ?Sized>: Send + Sync + fmt::Debug {
    /// Unique key of the task
    fn resource_key(&self) -> ResourceKey;

    /// Describe what a live pass would do
    fn preview(&self, ctx: &Context<'_, C>) -> Result<ResourceDiff>;

    /// Run through the backend
    fn run(&self, backend: Backend<'_, C>, reporter: &dyn Reporter) -> Result<Outcome>;
}

impl<T: Task> Reconcile<T::Cloud> for T {
    fn resource_key(&self) -> ResourceKey {
        self.key()
    }

    fn preview(&self, ctx: &Context<'_, T::Cloud>) -> Result<ResourceDiff> {
        preview(self, ctx)
    }

    fn run(&self, backend: Backend<'_, T::Cloud>, reporter: &dyn Reporter) -> Result<Outcome> {
        run_task(self, backend, reporter)
    }
}

/// A boxed task for type-erased storage
pub type BoxedTask<C> = Box<dyn Reconcile<C>>;

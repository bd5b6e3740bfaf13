//! # Declarative
//!
//! A framework for declarative resource reconciliation.
//!
//! This crate provides the core abstractions for declaring desired state,
//! discovering actual state, and converging a provider to match, either by
//! calling its API directly or by emitting infrastructure-as-code.
//!
//! ## Core Concepts
//!
//! - **Task**: One managed resource type; the same value describes desired
//!   state and the actual snapshot discovery returns
//! - **ChangeSet**: The sparse set of fields that differ between the two
//! - **Backend**: Where a pass sends its effects, live or IaC
//! - **ExecutionPlan**: Independent tasks sharing one provider client
//! - **Executor**: Previews and applies plans with parallelism
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{AutoConfirm, ExecuteOptions, ExecutionPlan, LogReporter, execute_live};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add(Box::new(policy))?;
//!
//! let summary = execute_live(&plan, &ExecuteOptions::default(), &client, &LogReporter, &mut AutoConfirm)?;
//! ```
//!
//! ## Injection Traits
//!
//! - [`Reporter`]: Observes progress and field diffs
//! - [`ConfirmCallback`]: Handles user confirmations
//! - [`IacTarget`]: Receives declared resources and files
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks, providers or IaC dialects.

pub mod changes;
pub mod context;
pub mod diff;
pub mod document;
pub mod error;
pub mod executor;
pub mod handle;
pub mod iac;
pub mod planner;
pub mod task;
pub mod types;

// Re-export main types at crate root
pub use changes::ChangeSet;
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, Context, LogReporter, NoReport, RecordingReporter,
    ReportEvent, Reporter,
};
pub use diff::{Action, DiffSummary, FieldDiff, Preview, ResourceDiff, group_by_kind, text_diff};
pub use document::{DocumentError, DocumentHolder};
pub use error::{BoxError, Error, Phase, Result};
pub use executor::{apply_plan, execute_iac, execute_live, preview_plan};
pub use handle::{Handle, ResourceKey};
pub use iac::{Field, IacTarget, LinkTable, Literal, Record};
pub use planner::ExecutionPlan;
pub use task::{Backend, BoxedTask, Discovered, Outcome, Reconcile, Task, apply_discovered, run_task};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary};

//! Execution engine for cloudup
//!
//! The engine orchestrates:
//! 1. Planning - Build the task plan from config
//! 2. Diffing - Show actual vs desired state
//! 3. Executing - Apply changes with parallelism

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute};
pub use planner::build_plan;

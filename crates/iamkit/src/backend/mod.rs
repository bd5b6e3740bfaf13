//! Backend abstraction for IAM operations.
//!
//! The [`Backend`] trait defines the interface for talking to IAM, allowing
//! for different implementations (real CLI, in-memory for testing).

pub mod aws_cli;
pub mod memory;

use crate::error::Result;
use crate::types::{PutRolePolicy, RolePolicy};

/// Backend trait for IAM role policy operations.
///
/// This trait abstracts the underlying transport, enabling:
/// - Real CLI execution via the `aws` command
/// - In-memory implementations for testing
pub trait Backend: Send + Sync {
    /// Check if the backend can reach IAM.
    fn is_available(&self) -> bool;

    /// Read an inline role policy.
    ///
    /// Returns [`Error::NoSuchEntity`](crate::Error::NoSuchEntity) when the
    /// role or the policy does not exist. The document is in wire form.
    fn get_role_policy(&self, role_name: &str, policy_name: &str) -> Result<RolePolicy>;

    /// Create or replace an inline role policy.
    fn put_role_policy(&self, request: &PutRolePolicy) -> Result<()>;
}

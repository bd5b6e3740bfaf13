//! Managed cloud resources
//!
//! Each resource type implements [`declarative::Task`] against the IAM client.

pub mod iam_role_policy;

pub use iam_role_policy::IamRolePolicy;

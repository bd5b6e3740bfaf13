//! # iamkit
//!
//! Pure Rust library for AWS IAM inline role policies.
//!
//! This crate provides functionality for:
//! - Reading and writing inline role policies through a pluggable backend
//! - Decoding the percent-encoded documents IAM returns
//! - Retrying throttled calls with exponential backoff
//!
//! ## Example
//!
//! ```no_run
//! use iamkit::{AwsSettings, Client, PutRolePolicy};
//!
//! let client = Client::new(AwsSettings::default()).expect("AWS CLI not available");
//!
//! if let Some(policy) = client.find_role_policy("nodes", "nodes-s3").expect("query failed") {
//!     println!("{:?}", policy.policy_document);
//! }
//!
//! client
//!     .put_role_policy(&PutRolePolicy::new("nodes", "nodes-s3", "{}"))
//!     .expect("put failed");
//! ```
//!
//! ## Testing
//!
//! [`MemoryBackend`] keeps policies in memory and records every call:
//!
//! ```
//! use iamkit::{Client, MemoryBackend};
//!
//! let backend = MemoryBackend::new();
//! backend.insert("nodes", "nodes-s3", "{}");
//!
//! let client = Client::with_backend(Box::new(backend.clone()));
//! assert!(client.find_role_policy("nodes", "nodes-s3").unwrap().is_some());
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod retry;
pub mod types;
pub mod wire;

pub use backend::memory::{Call, MemoryBackend};
pub use error::{Error, ErrorCategory, Result};
pub use types::{AwsSettings, PutRolePolicy, RetryConfig, RolePolicy};
pub use wire::{DecodeError, decode_document, encode_document};

use backend::{Backend, aws_cli::AwsCliBackend};

/// High-level client for IAM role policy operations.
///
/// The client wraps a backend and retries throttled calls.
pub struct Client {
    backend: Box<dyn Backend>,
    retry: RetryConfig,
}

impl Client {
    /// Create a client backed by the AWS CLI.
    ///
    /// Returns an error if the CLI is not installed.
    pub fn new(settings: AwsSettings) -> Result<Self> {
        let backend = AwsCliBackend::new(settings)?;
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
        }
    }

    /// Replace the retry configuration.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Check if the backend can reach IAM.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Read an inline role policy, failing if it does not exist.
    pub fn get_role_policy(&self, role_name: &str, policy_name: &str) -> Result<RolePolicy> {
        retry::with_retry(&self.retry, Some(&retry::LogCallback), || {
            self.backend.get_role_policy(role_name, policy_name)
        })
    }

    /// Read an inline role policy, mapping "no such entity" to `None`.
    pub fn find_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> Result<Option<RolePolicy>> {
        match self.get_role_policy(role_name, policy_name) {
            Ok(policy) => Ok(Some(policy)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or replace an inline role policy.
    pub fn put_role_policy(&self, request: &PutRolePolicy) -> Result<()> {
        log::debug!(
            "PutRolePolicy role={} policy={}",
            request.role_name,
            request.policy_name
        );
        retry::with_retry(&self.retry, Some(&retry::LogCallback), || {
            self.backend.put_role_policy(request)
        })
    }
}

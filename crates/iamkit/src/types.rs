//! Core types for IAM role policy operations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An inline policy attached to a role, as IAM reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RolePolicy {
    /// Name of the role the policy is attached to
    pub role_name: String,
    /// Name of the policy
    pub policy_name: String,
    /// Policy document in wire form (percent-encoded)
    pub policy_document: Option<String>,
}

/// Request to create or replace an inline role policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRolePolicy {
    /// Name of the role to attach the policy to
    pub role_name: String,
    /// Name of the policy
    pub policy_name: String,
    /// Policy document as plain JSON text
    pub policy_document: String,
}

impl PutRolePolicy {
    /// Create a new put request.
    pub fn new(
        role_name: impl Into<String>,
        policy_name: impl Into<String>,
        policy_document: impl Into<String>,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            policy_name: policy_name.into(),
            policy_document: policy_document.into(),
        }
    }
}

/// Connection settings for the AWS CLI backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSettings {
    /// Program to execute, `aws` by default
    pub program: String,
    /// Named profile passed as `--profile`
    pub profile: Option<String>,
    /// Region passed as `--region`
    pub region: Option<String>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
            profile: None,
            region: None,
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(20),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

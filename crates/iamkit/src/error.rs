//! Error types for IAM operations.
//!
//! Errors are categorized to enable retry logic and to let callers tell a
//! missing entity apart from a real failure.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Error line the AWS CLI prints for service errors.
static SERVICE_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"An error occurred \(([^)]+)\) when calling the (\w+) operation(?: \([^)]*\))?: (.*)")
        .expect("hardcoded regex pattern is valid")
});

/// Categories of IAM errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The role or policy does not exist
    NoSuchEntity,
    /// Request rate exceeded (transient, retryable)
    Throttled,
    /// Endpoint unreachable (transient, retryable)
    Network,
    /// Credentials lack the required permission
    AccessDenied,
    /// The request was rejected as malformed
    Validation,
    /// The AWS CLI is not installed
    CliNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled | Self::Network)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoSuchEntity => "Entity not found",
            Self::Throttled => "Request throttled",
            Self::Network => "Network connectivity issue",
            Self::AccessDenied => "Access denied",
            Self::Validation => "Invalid request",
            Self::CliNotFound => "AWS CLI not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NoSuchEntity => "Check the role and policy names",
            Self::Throttled => "Lower the number of parallel jobs and try again",
            Self::Network => "Check your internet connection and try again",
            Self::AccessDenied => "Check the credentials of the selected profile",
            Self::Validation => "Check the policy document syntax",
            Self::CliNotFound => "Install the AWS CLI or set aws.program in the config",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during IAM operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The role or policy does not exist
    #[error("no such entity: {message}")]
    NoSuchEntity {
        /// Message returned by the service
        message: String,
    },

    /// Request rate exceeded
    #[error("throttled: {message}")]
    Throttled {
        /// Message returned by the service
        message: String,
    },

    /// Endpoint unreachable
    #[error("network error: {message}")]
    Network {
        /// Detailed error message
        message: String,
    },

    /// Access denied
    #[error("access denied: {message}")]
    AccessDenied {
        /// Message returned by the service
        message: String,
    },

    /// Request rejected as malformed
    #[error("{code}: {message}")]
    Validation {
        /// Service error code
        code: String,
        /// Message returned by the service
        message: String,
    },

    /// The AWS CLI could not be found
    #[error("AWS CLI not found: {program}")]
    CliNotFound {
        /// Program that was looked up
        program: String,
    },

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoSuchEntity { .. } => ErrorCategory::NoSuchEntity,
            Self::Throttled { .. } => ErrorCategory::Throttled,
            Self::Network { .. } => ErrorCategory::Network,
            Self::AccessDenied { .. } => ErrorCategory::AccessDenied,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::CliNotFound { .. } => ErrorCategory::CliNotFound,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the service reported that the entity does not exist.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NoSuchEntity
    }

    /// Create an error from AWS CLI output.
    ///
    /// Analyzes stderr to categorize the error appropriately.
    pub fn from_aws_output(stderr: &str, operation: &str) -> Self {
        if let Some(caps) = SERVICE_ERROR.captures(stderr) {
            let code = caps[1].to_string();
            let message = caps[3].trim().to_string();
            return Self::from_service_code(code, message);
        }

        let stderr_lower = stderr.to_lowercase();
        if stderr_lower.contains("could not connect")
            || stderr_lower.contains("connect timeout")
            || stderr_lower.contains("read timeout")
            || stderr_lower.contains("connection was closed")
        {
            return Self::Network {
                message: stderr.trim().to_string(),
            };
        }

        Self::CommandFailed {
            message: format!("aws iam {operation} failed"),
            stderr: stderr.trim().to_string(),
        }
    }

    /// Create an error from a service error code.
    pub fn from_service_code(code: String, message: String) -> Self {
        match code.as_str() {
            "NoSuchEntity" | "NoSuchEntityException" => Self::NoSuchEntity { message },
            "Throttling" | "ThrottlingException" | "RequestLimitExceeded" => {
                Self::Throttled { message }
            }
            "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation" => {
                Self::AccessDenied { message }
            }
            _ => Self::Validation { code, message },
        }
    }
}

/// Result type for IAM operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Throttled.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::NoSuchEntity.is_retryable());
        assert!(!ErrorCategory::AccessDenied.is_retryable());
    }

    #[test]
    fn test_from_aws_output_no_such_entity() {
        let err = Error::from_aws_output(
            "\nAn error occurred (NoSuchEntity) when calling the GetRolePolicy operation: \
             The role policy with name p1 cannot be found.\n",
            "get-role-policy",
        );
        assert!(err.is_not_found());
        assert!(err.to_string().contains("p1 cannot be found"));
    }

    #[test]
    fn test_from_aws_output_throttled_with_retries_note() {
        let err = Error::from_aws_output(
            "An error occurred (Throttling) when calling the PutRolePolicy operation \
             (reached max retries: 2): Rate exceeded",
            "put-role-policy",
        );
        assert_eq!(err.category(), ErrorCategory::Throttled);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_aws_output_malformed_policy() {
        let err = Error::from_aws_output(
            "An error occurred (MalformedPolicyDocument) when calling the PutRolePolicy \
             operation: Syntax errors in policy.",
            "put-role-policy",
        );
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(
            err.to_string(),
            "MalformedPolicyDocument: Syntax errors in policy."
        );
    }

    #[test]
    fn test_from_aws_output_network() {
        let err = Error::from_aws_output(
            "Could not connect to the endpoint URL: \"https://iam.amazonaws.com/\"",
            "get-role-policy",
        );
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_from_aws_output_unknown() {
        let err = Error::from_aws_output("Unable to locate credentials", "get-role-policy");
        assert_eq!(err.category(), ErrorCategory::Other);
        assert!(err.to_string().contains("get-role-policy"));
    }
}

//! Error types for task reconciliation
//!
//! Every variant names the resource it belongs to and keeps the underlying
//! cause as its source. A provider "not found" answer is not an error: discovery
//! turns it into an absent snapshot.

use crate::handle::ResourceKey;
use std::fmt;

/// Boxed underlying cause of a reconciliation error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciliation phase an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Querying the provider for actual state
    Discover,
    /// Checking the desired description before apply
    Validate,
    /// Turning a document or record into its output form
    Render,
    /// Mutating the provider
    Apply,
    /// Assembling a plan or an IaC output
    Plan,
}

impl Phase {
    /// Get a user-friendly description of this phase.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Discover => "discovery",
            Self::Validate => "validation",
            Self::Render => "rendering",
            Self::Apply => "apply",
            Self::Plan => "planning",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Errors raised while reconciling a task.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provider failed to report actual state.
    #[error("error querying {key} ({context}): {source}")]
    ProviderQuery {
        /// Resource being discovered
        key: ResourceKey,
        /// Identity the query was made with
        context: String,
        /// Provider error
        #[source]
        source: BoxError,
    },

    /// A provider payload could not be decoded from its transport encoding.
    #[error("error decoding {field} for {key}: {source}")]
    Decode {
        /// Resource being discovered
        key: ResourceKey,
        /// Field that failed to decode
        field: &'static str,
        /// Decoder error
        #[source]
        source: BoxError,
    },

    /// A field required for apply is empty.
    #[error("{key}: required field {field} is missing")]
    MissingRequiredField {
        /// Resource being validated
        key: ResourceKey,
        /// Name of the missing field
        field: &'static str,
    },

    /// A document could not be rendered to text.
    #[error("error rendering {field} for {key}: {source}")]
    Render {
        /// Resource being rendered
        key: ResourceKey,
        /// Field being rendered
        field: &'static str,
        /// Rendering error
        #[source]
        source: BoxError,
    },

    /// The provider rejected a mutation.
    #[error("error applying {key} ({context}): {source}")]
    Apply {
        /// Resource being applied
        key: ResourceKey,
        /// Identity the mutation was made with
        context: String,
        /// Provider error
        #[source]
        source: BoxError,
    },

    /// Two tasks in one plan share a key.
    #[error("duplicate task for {0}")]
    DuplicateKey(ResourceKey),

    /// An IaC target received the same resource twice.
    #[error("resource {0} is already declared")]
    DuplicateResource(ResourceKey),

    /// A symbolic link points at a resource the target never registered.
    #[error("unresolved link to {0}")]
    UnresolvedLink(ResourceKey),

    /// Two distinct resources map to the same output address.
    #[error("{key} and {existing} share the output address {address}")]
    AddressCollision {
        /// Resource that was rejected
        key: ResourceKey,
        /// Resource already holding the address
        existing: ResourceKey,
        /// Contested address
        address: String,
    },
}

impl Error {
    /// Create a provider query error.
    pub fn provider_query(
        key: ResourceKey,
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ProviderQuery {
            key,
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(key: ResourceKey, field: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            key,
            field,
            source: source.into(),
        }
    }

    /// Create a missing required field error.
    pub fn missing_field(key: ResourceKey, field: &'static str) -> Self {
        Self::MissingRequiredField { key, field }
    }

    /// Create a render error.
    pub fn render(key: ResourceKey, field: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Render {
            key,
            field,
            source: source.into(),
        }
    }

    /// Create an apply error.
    pub fn apply(key: ResourceKey, context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Apply {
            key,
            context: context.into(),
            source: source.into(),
        }
    }

    /// The resource this error is attributed to.
    pub fn key(&self) -> &ResourceKey {
        match self {
            Self::ProviderQuery { key, .. }
            | Self::Decode { key, .. }
            | Self::MissingRequiredField { key, .. }
            | Self::Render { key, .. }
            | Self::Apply { key, .. }
            | Self::AddressCollision { key, .. } => key,
            Self::DuplicateKey(key) | Self::DuplicateResource(key) | Self::UnresolvedLink(key) => {
                key
            }
        }
    }

    /// The phase this error was raised in.
    pub fn phase(&self) -> Phase {
        match self {
            Self::ProviderQuery { .. } | Self::Decode { .. } => Phase::Discover,
            Self::MissingRequiredField { .. } => Phase::Validate,
            Self::Render { .. } | Self::UnresolvedLink(_) | Self::AddressCollision { .. } => {
                Phase::Render
            }
            Self::Apply { .. } => Phase::Apply,
            Self::DuplicateKey(_) | Self::DuplicateResource(_) => Phase::Plan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    fn key() -> ResourceKey {
        ResourceKey::new("aws_iam_role_policy", "p1")
    }

    #[test]
    fn test_missing_field_message() {
        let err = Error::missing_field(key(), "Name");
        assert_eq!(
            err.to_string(),
            "aws_iam_role_policy.p1: required field Name is missing"
        );
        assert_eq!(err.phase(), Phase::Validate);
    }

    #[test]
    fn test_source_chain_preserved() {
        let cause = io::Error::other("boom");
        let err = Error::apply(key(), "role r1", cause);
        assert_eq!(err.phase(), Phase::Apply);
        assert_eq!(err.key(), &key());
        assert_eq!(err.source().map(ToString::to_string), Some("boom".to_string()));
    }

    #[test]
    fn test_framework_errors_phase() {
        assert_eq!(Error::DuplicateKey(key()).phase(), Phase::Plan);
        assert_eq!(Error::UnresolvedLink(key()).phase(), Phase::Render);
    }

    #[test]
    fn test_address_collision_names_both_resources() {
        let err = Error::AddressCollision {
            key: ResourceKey::new("aws_iam_role", "a-b"),
            existing: ResourceKey::new("aws_iam_role", "a.b"),
            address: "aws_iam_role.a-b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "aws_iam_role.a-b and aws_iam_role.a.b share the output address aws_iam_role.a-b"
        );
        assert_eq!(err.phase(), Phase::Render);
        assert_eq!(err.key(), &ResourceKey::new("aws_iam_role", "a-b"));
    }
}

//! Resource identity and cross-resource handles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a managed resource: its kind plus its name.
///
/// Kinds are the IaC resource type names (e.g. "aws_iam_role_policy"), so a
/// key doubles as the unresolved half of a symbolic reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Resource kind
    pub kind: String,
    /// Resource name, unique within its kind
    pub name: String,
}

impl ResourceKey {
    /// Create a new key.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// Non-owning reference to another managed resource.
///
/// Carries just enough to look the resource up (its name) and, once the
/// owning task has run, its provider identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handle {
    /// Name of the referenced resource
    pub name: String,
    /// Provider identifier, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Handle {
    /// Reference a resource by name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    /// Attach a provider identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Key of the referenced resource, given its kind.
    pub fn key(&self, kind: &str) -> ResourceKey {
        ResourceKey::new(kind, &self.name)
    }
}

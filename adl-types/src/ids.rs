//! Identifier types used throughout the ADL client.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of an entity in the attribute store.
///
/// The store assigns no structure to the id; any string is accepted and an
/// id for an entity that was never written is still valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a fresh identifier.
    /// Uses UUID v7 text so generated ids sort by creation time.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The authenticated identity a request is made on behalf of.
///
/// Supplied by the surrounding platform; the client never authenticates
/// anything itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub project_id: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            project_id: project_id.into(),
        }
    }

    /// A caller with no identity, for local tooling.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Returns true if neither user nor project is set.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_empty() && self.project_id.is_empty()
    }
}

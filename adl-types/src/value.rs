//! Attribute kinds and list entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of data structure an attribute name refers to.
///
/// Names live in separate namespaces per kind: a property `x`, a counter `x`
/// and a set `x` on the same entity are unrelated attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Property,
    Metadata,
    Counter,
    Set,
    List,
}

impl AttributeKind {
    /// Every kind, in the order operations are sent to the store.
    pub const ALL: [AttributeKind; 5] = [
        AttributeKind::Property,
        AttributeKind::Metadata,
        AttributeKind::Counter,
        AttributeKind::Set,
        AttributeKind::List,
    ];

    /// Short lowercase name, used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AttributeKind::Property => "property",
            AttributeKind::Metadata => "metadata",
            AttributeKind::Counter => "counter",
            AttributeKind::Set => "set",
            AttributeKind::List => "list",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub key: String,
    pub value: String,
}

impl ListItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

//! Read projections.
//!
//! A projection names one piece of an entity to fetch. Building one is pure;
//! only passing a batch of them to [`EntityHandle::read`] performs I/O, and
//! the whole batch travels in one round trip.
//!
//! [`EntityHandle::read`]: crate::EntityHandle::read

use serde::{Deserialize, Serialize};

/// A bounded scan over an ordered list.
///
/// `start` is inclusive, `end` is exclusive and an empty `end` leaves the
/// range open. A `limit` of 0 means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListRange {
    pub list: String,
    pub start: String,
    pub end: String,
    pub limit: usize,
}

impl ListRange {
    /// The whole list, in key order.
    pub fn all(list: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            start: String::new(),
            end: String::new(),
            limit: 0,
        }
    }

    /// Starts the range at `key` (inclusive).
    pub fn from(mut self, key: impl Into<String>) -> Self {
        self.start = key.into();
        self
    }

    /// Ends the range before `key`.
    pub fn until(mut self, key: impl Into<String>) -> Self {
        self.end = key.into();
        self
    }

    /// Caps the number of returned items.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `key` falls inside the range bounds (ignoring the limit).
    pub fn contains(&self, key: &str) -> bool {
        key >= self.start.as_str() && (self.end.is_empty() || key < self.end.as_str())
    }
}

/// One fragment of a read request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// A single property value.
    Property { name: String },
    /// The metadata string attached to a property.
    Metadata { name: String },
    /// A counter's accumulated value.
    Counter { name: String },
    /// Every member of a set.
    Set { name: String },
    /// Every property whose name starts with `prefix`.
    PropertiesWithPrefix { prefix: String },
    /// A key range of an ordered list.
    ListRange(ListRange),
}

impl Projection {
    pub fn property(name: impl Into<String>) -> Self {
        Projection::Property { name: name.into() }
    }

    pub fn metadata(name: impl Into<String>) -> Self {
        Projection::Metadata { name: name.into() }
    }

    pub fn counter(name: impl Into<String>) -> Self {
        Projection::Counter { name: name.into() }
    }

    pub fn set(name: impl Into<String>) -> Self {
        Projection::Set { name: name.into() }
    }

    pub fn properties_with_prefix(prefix: impl Into<String>) -> Self {
        Projection::PropertiesWithPrefix {
            prefix: prefix.into(),
        }
    }

    /// `end` empty means open-ended; `limit` 0 means unbounded.
    pub fn list_range(
        list: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        limit: usize,
    ) -> Self {
        Projection::ListRange(ListRange {
            list: list.into(),
            start: start.into(),
            end: end.into(),
            limit,
        })
    }

    /// The attribute name (or prefix) the fragment targets.
    pub fn target(&self) -> &str {
        match self {
            Projection::Property { name }
            | Projection::Metadata { name }
            | Projection::Counter { name }
            | Projection::Set { name } => name,
            Projection::PropertiesWithPrefix { prefix } => prefix,
            Projection::ListRange(range) => &range.list,
        }
    }
}

impl From<ListRange> for Projection {
    fn from(range: ListRange) -> Self {
        Projection::ListRange(range)
    }
}

//! Pending mutation buffer.
//!
//! Staged writes are keyed by `(kind, name)`. Every mutation is first turned
//! into a [`Staged`] value and then folded into whatever is already staged
//! for that attribute by [`Staged::merge`]:
//!
//! | kind              | merge                          |
//! |-------------------|--------------------------------|
//! | property/metadata | last write wins                |
//! | counter           | deltas add up (in `i128`)      |
//! | set               | last op per member wins        |
//! | list              | last write per key wins        |
//!
//! The buffer is not synchronized; it belongs to exactly one handle.

use crate::codec;
use crate::error::AdlResult;
use crate::protocol::Operation;
use adl_types::AttributeKind;
use std::collections::BTreeMap;

/// Net effect staged for one set member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetOp {
    Add,
    Remove,
}

/// The accumulated staged state of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    Property(String),
    Metadata(String),
    /// Net delta. Wider than the wire type so intermediate sums never wrap;
    /// the range is checked when the buffer is encoded.
    Counter(i128),
    Set(BTreeMap<String, SetOp>),
    List(BTreeMap<String, String>),
}

impl Staged {
    /// Folds a newer staged value for the same attribute into this one.
    pub fn merge(&mut self, newer: Staged) {
        match (self, newer) {
            (Staged::Property(value), Staged::Property(next))
            | (Staged::Metadata(value), Staged::Metadata(next)) => *value = next,
            (Staged::Counter(delta), Staged::Counter(next)) => {
                *delta += next;
            }
            (Staged::Set(ops), Staged::Set(next)) => ops.extend(next),
            (Staged::List(items), Staged::List(next)) => items.extend(next),
            // keys carry the kind, so a mismatch means the slot is being reused
            (slot, newer) => *slot = newer,
        }
    }
}

/// Identifies one attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeKey {
    pub kind: AttributeKind,
    pub name: String,
}

impl AttributeKey {
    pub fn new(kind: AttributeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// A single mutation call made on an entity handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    WriteProperty { name: String, value: String },
    WriteMetadata { name: String, value: String },
    IncrementCounter { name: String, delta: i64 },
    AddSetItem { name: String, member: String },
    RemoveSetItem { name: String, member: String },
    AddListItem { list: String, key: String, value: String },
}

impl Mutation {
    fn into_staged(self) -> (AttributeKey, Staged) {
        match self {
            Mutation::WriteProperty { name, value } => (
                AttributeKey::new(AttributeKind::Property, name),
                Staged::Property(value),
            ),
            Mutation::WriteMetadata { name, value } => (
                AttributeKey::new(AttributeKind::Metadata, name),
                Staged::Metadata(value),
            ),
            Mutation::IncrementCounter { name, delta } => (
                AttributeKey::new(AttributeKind::Counter, name),
                Staged::Counter(i128::from(delta)),
            ),
            Mutation::AddSetItem { name, member } => (
                AttributeKey::new(AttributeKind::Set, name),
                Staged::Set(BTreeMap::from([(member, SetOp::Add)])),
            ),
            Mutation::RemoveSetItem { name, member } => (
                AttributeKey::new(AttributeKind::Set, name),
                Staged::Set(BTreeMap::from([(member, SetOp::Remove)])),
            ),
            Mutation::AddListItem { list, key, value } => (
                AttributeKey::new(AttributeKind::List, list),
                Staged::List(BTreeMap::from([(key, value)])),
            ),
        }
    }
}

/// Mutations staged on one entity since the last commit.
#[derive(Debug, Clone, Default)]
pub struct PendingMutations {
    entries: BTreeMap<AttributeKey, Staged>,
    calls: usize,
}

impl PendingMutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a mutation, merging it with anything already staged for the
    /// same attribute.
    pub fn stage(&mut self, mutation: Mutation) {
        let (key, staged) = mutation.into_staged();
        match self.entries.get_mut(&key) {
            Some(slot) => slot.merge(staged),
            None => {
                self.entries.insert(key, staged);
            }
        }
        self.calls += 1;
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct attributes with staged changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of mutation calls folded into the buffer.
    pub fn staged_calls(&self) -> usize {
        self.calls
    }

    /// The staged state of one attribute.
    pub fn get(&self, kind: AttributeKind, name: &str) -> Option<&Staged> {
        self.entries.get(&AttributeKey::new(kind, name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &Staged)> {
        self.entries.iter()
    }

    /// Encodes the staged state as wire operations without clearing it.
    ///
    /// Operations are ordered by kind, then name, then member or key. Fails
    /// if a counter's net delta does not fit the wire's `i64`.
    pub fn operations(&self) -> AdlResult<Vec<Operation>> {
        let mut ops = Vec::with_capacity(self.entries.len());
        for (key, staged) in &self.entries {
            codec::encode_staged(&key.name, staged, &mut ops)?;
        }
        Ok(ops)
    }

    /// Empties the buffer and returns its operations.
    ///
    /// The buffer is emptied even when encoding fails.
    pub fn drain(&mut self) -> AdlResult<Vec<Operation>> {
        let ops = self.operations();
        self.clear();
        ops
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.calls = 0;
    }
}

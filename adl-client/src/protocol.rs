//! Messages exchanged with the attribute store.
//!
//! One request type per round trip:
//! 1. [`ReadRequest`] carries the projections of a `read`; the store answers
//!    with one [`ProjectionResult`] per projection, in request order.
//! 2. [`CommitRequest`] carries every staged operation of a commit; the store
//!    applies all of them or none.

use crate::projection::Projection;
use adl_types::{Caller, EntityId, ListItem};
use serde::{Deserialize, Serialize};

/// Wire protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Fetch the given projections of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub version: u32,
    pub entity_id: EntityId,
    pub caller: Caller,
    pub projections: Vec<Projection>,
}

impl ReadRequest {
    pub fn new(entity_id: EntityId, caller: Caller, projections: Vec<Projection>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            entity_id,
            caller,
            projections,
        }
    }
}

/// Results of a [`ReadRequest`], positionally matching its projections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResponse {
    pub results: Vec<ProjectionResult>,
}

/// The store's answer to one projection.
///
/// `None` means the store holds nothing under that name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionResult {
    Property {
        name: String,
        value: Option<String>,
    },
    Metadata {
        name: String,
        value: Option<String>,
    },
    Counter {
        name: String,
        value: Option<i64>,
    },
    Set {
        name: String,
        members: Option<Vec<String>>,
    },
    PropertiesWithPrefix {
        prefix: String,
        properties: Vec<(String, String)>,
    },
    ListRange {
        list: String,
        items: Option<Vec<ListItem>>,
    },
}

/// One mutation as sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    WriteProperty { name: String, value: String },
    WriteMetadata { name: String, value: String },
    IncrementCounter { name: String, delta: i64 },
    AddSetMember { name: String, member: String },
    RemoveSetMember { name: String, member: String },
    PutListItem { list: String, key: String, value: String },
}

impl Operation {
    /// The attribute the operation targets.
    pub fn target(&self) -> &str {
        match self {
            Operation::WriteProperty { name, .. }
            | Operation::WriteMetadata { name, .. }
            | Operation::IncrementCounter { name, .. }
            | Operation::AddSetMember { name, .. }
            | Operation::RemoveSetMember { name, .. } => name,
            Operation::PutListItem { list, .. } => list,
        }
    }
}

/// Apply every operation atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub version: u32,
    pub entity_id: EntityId,
    pub caller: Caller,
    pub operations: Vec<Operation>,
}

impl CommitRequest {
    pub fn new(entity_id: EntityId, caller: Caller, operations: Vec<Operation>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            entity_id,
            caller,
            operations,
        }
    }
}

/// Acknowledgment of an applied commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResponse {
    /// Number of operations applied.
    pub applied: usize,
}

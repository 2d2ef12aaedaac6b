//! In-memory attribute store.
//!
//! A complete [`AttributeStore`] held in process memory. Commits are
//! validated in full before anything is written and then applied under a
//! single write lock, so a rejected or cancelled commit changes nothing.
//!
//! Faults and latency can be injected to exercise client error paths.

use crate::codec;
use crate::error::{AdlError, AdlResult, RemoteErrorCode};
use crate::projection::Projection;
use crate::protocol::{
    CommitRequest, CommitResponse, Operation, PROTOCOL_VERSION, ProjectionResult, ReadRequest,
    ReadResponse,
};
use crate::store::AttributeStore;
use adl_types::{EntityId, ListItem};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Request limits enforced by [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLimits {
    /// Most projections accepted in one read.
    pub max_projections: usize,
    /// Most operations accepted in one commit.
    pub max_operations: usize,
    /// Largest encoded commit request accepted (bytes).
    pub max_request_bytes: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_projections: 256,
            max_operations: 10_000,
            max_request_bytes: 4 * 1024 * 1024, // 4 MB
        }
    }
}

/// Everything stored for one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySnapshot {
    pub properties: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
    pub counters: BTreeMap<String, i64>,
    pub sets: BTreeMap<String, BTreeSet<String>>,
    pub lists: BTreeMap<String, BTreeMap<String, String>>,
}

impl EntitySnapshot {
    fn resolve(&self, projection: &Projection) -> ProjectionResult {
        match projection {
            Projection::Property { name } => ProjectionResult::Property {
                name: name.clone(),
                value: self.properties.get(name).cloned(),
            },
            Projection::Metadata { name } => ProjectionResult::Metadata {
                name: name.clone(),
                value: self.metadata.get(name).cloned(),
            },
            Projection::Counter { name } => ProjectionResult::Counter {
                name: name.clone(),
                value: self.counters.get(name).copied(),
            },
            Projection::Set { name } => ProjectionResult::Set {
                name: name.clone(),
                members: self.sets.get(name).map(|m| m.iter().cloned().collect()),
            },
            Projection::PropertiesWithPrefix { prefix } => ProjectionResult::PropertiesWithPrefix {
                prefix: prefix.clone(),
                properties: self
                    .properties
                    .range(prefix.clone()..)
                    .take_while(|(name, _)| name.starts_with(prefix.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            },
            Projection::ListRange(range) => ProjectionResult::ListRange {
                list: range.list.clone(),
                items: self.lists.get(&range.list).map(|items| {
                    let limit = if range.limit == 0 {
                        usize::MAX
                    } else {
                        range.limit
                    };
                    items
                        .range(range.start.clone()..)
                        .take_while(|(key, _)| range.contains(key))
                        .take(limit)
                        .map(|(key, value)| ListItem::new(key.clone(), value.clone()))
                        .collect()
                }),
            },
        }
    }

    /// Fails if applying the increments in `operations`, in order, would take
    /// any counter outside the `i64` range.
    fn check_counters(&self, operations: &[Operation]) -> AdlResult<()> {
        let mut totals: HashMap<&str, i64> = HashMap::new();
        for operation in operations {
            let Operation::IncrementCounter { name, delta } = operation else {
                continue;
            };
            let current = match totals.get(name.as_str()) {
                Some(total) => *total,
                None => self.counters.get(name).copied().unwrap_or(0),
            };
            let next = current.checked_add(*delta).ok_or_else(|| {
                AdlError::remote(
                    RemoteErrorCode::InvalidOperation,
                    format!("counter {name:?} would overflow"),
                )
            })?;
            totals.insert(name.as_str(), next);
        }
        Ok(())
    }

    fn apply(&mut self, operation: Operation) {
        match operation {
            Operation::WriteProperty { name, value } => {
                self.properties.insert(name, value);
            }
            Operation::WriteMetadata { name, value } => {
                self.metadata.insert(name, value);
            }
            Operation::IncrementCounter { name, delta } => {
                // range checked by `check_counters` before any operation runs
                *self.counters.entry(name).or_insert(0) += delta;
            }
            Operation::AddSetMember { name, member } => {
                self.sets.entry(name).or_default().insert(member);
            }
            Operation::RemoveSetMember { name, member } => {
                if let Some(members) = self.sets.get_mut(&name) {
                    members.remove(&member);
                    if members.is_empty() {
                        self.sets.remove(&name);
                    }
                }
            }
            Operation::PutListItem { list, key, value } => {
                self.lists.entry(list).or_default().insert(key, value);
            }
        }
    }
}

/// A failure to inject into the next matching request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail before touching state, as a dropped connection would.
    Unavailable(String),
    /// Reject the request.
    Reject(RemoteErrorCode, String),
    /// Apply the commit, then report the connection as lost.
    LostAck,
}

impl Fault {
    fn into_error(self) -> AdlError {
        match self {
            Fault::Unavailable(reason) => AdlError::StoreUnavailable(reason),
            Fault::Reject(code, message) => AdlError::remote(code, message),
            Fault::LostAck => AdlError::StoreUnavailable("connection lost after apply".into()),
        }
    }
}

#[derive(Debug)]
struct Faults {
    available: bool,
    next_fetch: Option<Fault>,
    next_apply: Option<Fault>,
    latency: Option<Duration>,
}

/// An [`AttributeStore`] kept in memory.
#[derive(Debug)]
pub struct InMemoryStore {
    entities: RwLock<HashMap<EntityId, EntitySnapshot>>,
    limits: StoreLimits,
    faults: Mutex<Faults>,
    fetches: AtomicUsize,
    commits: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store with default limits.
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            limits,
            faults: Mutex::new(Faults {
                available: true,
                next_fetch: None,
                next_apply: None,
                latency: None,
            }),
            fetches: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        }
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    /// Makes every request fail with `StoreUnavailable` until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.faults().available = available;
    }

    /// Fails the next read with `fault`.
    pub fn fail_next_fetch(&self, fault: Fault) {
        self.faults().next_fetch = Some(fault);
    }

    /// Fails the next commit with `fault`.
    pub fn fail_next_apply(&self, fault: Fault) {
        self.faults().next_apply = Some(fault);
    }

    /// Delays every request before it touches state.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults().latency = latency;
    }

    /// Number of reads that reached the store.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of commits applied.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::Relaxed)
    }

    /// A copy of everything stored for `entity_id`.
    pub async fn snapshot(&self, entity_id: &EntityId) -> Option<EntitySnapshot> {
        self.entities.read().await.get(entity_id).cloned()
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn simulate_network(&self) -> AdlResult<()> {
        let (available, latency) = {
            let faults = self.faults();
            (faults.available, faults.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !available {
            return Err(AdlError::StoreUnavailable("store offline".into()));
        }
        Ok(())
    }

    fn validate_read(&self, request: &ReadRequest) -> AdlResult<()> {
        let invalid =
            |message: String| AdlError::remote(RemoteErrorCode::InvalidProjection, message);

        if request.version != PROTOCOL_VERSION {
            return Err(invalid(format!(
                "unsupported protocol version {}",
                request.version
            )));
        }
        if request.projections.len() > self.limits.max_projections {
            return Err(AdlError::remote(
                RemoteErrorCode::TooLarge,
                format!(
                    "{} projections exceed the limit of {}",
                    request.projections.len(),
                    self.limits.max_projections
                ),
            ));
        }
        for projection in &request.projections {
            // an empty prefix scans every property
            let needs_name = !matches!(projection, Projection::PropertiesWithPrefix { .. });
            if needs_name && projection.target().is_empty() {
                return Err(invalid(format!("empty attribute name in {projection:?}")));
            }
        }
        Ok(())
    }

    fn validate_commit(&self, request: &CommitRequest) -> AdlResult<()> {
        let invalid =
            |message: String| AdlError::remote(RemoteErrorCode::InvalidOperation, message);

        if request.version != PROTOCOL_VERSION {
            return Err(invalid(format!(
                "unsupported protocol version {}",
                request.version
            )));
        }
        if request.operations.len() > self.limits.max_operations {
            return Err(AdlError::remote(
                RemoteErrorCode::TooLarge,
                format!(
                    "{} operations exceed the limit of {}",
                    request.operations.len(),
                    self.limits.max_operations
                ),
            ));
        }
        let size = codec::encoded_len(request)?;
        if size > self.limits.max_request_bytes {
            return Err(AdlError::remote(
                RemoteErrorCode::TooLarge,
                format!(
                    "commit of {size} bytes exceeds the limit of {}",
                    self.limits.max_request_bytes
                ),
            ));
        }
        for operation in &request.operations {
            if operation.target().is_empty() {
                return Err(invalid(format!("empty attribute name in {operation:?}")));
            }
            if matches!(operation, Operation::PutListItem { key, .. } if key.is_empty()) {
                return Err(invalid(format!("empty list key in {operation:?}")));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AttributeStore for InMemoryStore {
    async fn fetch(&self, request: ReadRequest) -> AdlResult<ReadResponse> {
        self.simulate_network().await?;
        let fault = self.faults().next_fetch.take();
        if let Some(fault) = fault {
            warn!(entity = %request.entity_id, ?fault, "injected read fault");
            return Err(fault.into_error());
        }
        self.validate_read(&request)?;

        let entities = self.entities.read().await;
        let empty = EntitySnapshot::default();
        let entity = entities.get(&request.entity_id).unwrap_or(&empty);
        let results = request
            .projections
            .iter()
            .map(|projection| entity.resolve(projection))
            .collect();
        self.fetches.fetch_add(1, Ordering::Relaxed);

        debug!(
            entity = %request.entity_id,
            projections = request.projections.len(),
            "resolved read"
        );
        Ok(ReadResponse { results })
    }

    async fn apply(&self, request: CommitRequest) -> AdlResult<CommitResponse> {
        self.simulate_network().await?;
        let fault = self.faults().next_apply.take();
        let lost_ack = fault == Some(Fault::LostAck);
        if let Some(fault) = fault.filter(|f| *f != Fault::LostAck) {
            warn!(entity = %request.entity_id, ?fault, "injected commit fault");
            return Err(fault.into_error());
        }
        self.validate_commit(&request)?;

        let applied = request.operations.len();
        {
            let mut entities = self.entities.write().await;
            match entities.get(&request.entity_id) {
                Some(entity) => entity.check_counters(&request.operations)?,
                None => EntitySnapshot::default().check_counters(&request.operations)?,
            }
            let entity = entities.entry(request.entity_id.clone()).or_default();
            for operation in request.operations {
                entity.apply(operation);
            }
        }
        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!(entity = %request.entity_id, applied, "applied commit");

        if lost_ack {
            warn!(entity = %request.entity_id, "dropping commit acknowledgment");
            return Err(Fault::LostAck.into_error());
        }
        Ok(CommitResponse { applied })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adl_types::Caller;

    fn commit(entity: &str, operations: Vec<Operation>) -> CommitRequest {
        CommitRequest::new(EntityId::new(entity), Caller::anonymous(), operations)
    }

    fn read(entity: &str, projections: Vec<Projection>) -> ReadRequest {
        ReadRequest::new(EntityId::new(entity), Caller::anonymous(), projections)
    }

    #[tokio::test]
    async fn unknown_entity_reads_as_absent() {
        let store = InMemoryStore::new();
        let response = store
            .fetch(read("nope", vec![Projection::counter("c")]))
            .await
            .unwrap();
        assert_eq!(
            response.results,
            vec![ProjectionResult::Counter {
                name: "c".into(),
                value: None
            }]
        );
    }

    #[tokio::test]
    async fn invalid_operation_rejects_whole_commit() {
        let store = InMemoryStore::new();
        let err = store
            .apply(commit(
                "e",
                vec![
                    Operation::WriteProperty {
                        name: "ok".into(),
                        value: "v".into(),
                    },
                    Operation::WriteProperty {
                        name: String::new(),
                        value: "v".into(),
                    },
                ],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.remote_code(), Some(RemoteErrorCode::InvalidOperation));
        assert!(store.snapshot(&EntityId::new("e")).await.is_none());
    }

    #[tokio::test]
    async fn oversized_commit_is_rejected() {
        let store = InMemoryStore::with_limits(StoreLimits {
            max_operations: 1,
            ..StoreLimits::default()
        });
        let ops = vec![
            Operation::IncrementCounter {
                name: "a".into(),
                delta: 1,
            },
            Operation::IncrementCounter {
                name: "b".into(),
                delta: 1,
            },
        ];
        let err = store.apply(commit("e", ops)).await.unwrap_err();
        assert_eq!(err.remote_code(), Some(RemoteErrorCode::TooLarge));
    }

    #[tokio::test]
    async fn counter_overflow_rejects_whole_commit() {
        let store = InMemoryStore::new();
        store
            .apply(commit(
                "e",
                vec![Operation::IncrementCounter {
                    name: "c".into(),
                    delta: i64::MAX,
                }],
            ))
            .await
            .unwrap();

        let err = store
            .apply(commit(
                "e",
                vec![
                    Operation::WriteProperty {
                        name: "p".into(),
                        value: "v".into(),
                    },
                    Operation::IncrementCounter {
                        name: "c".into(),
                        delta: 1,
                    },
                ],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.remote_code(), Some(RemoteErrorCode::InvalidOperation));

        let snapshot = store.snapshot(&EntityId::new("e")).await.unwrap();
        assert_eq!(snapshot.counters.get("c"), Some(&i64::MAX));
        assert!(snapshot.properties.is_empty());
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn counter_increments_within_one_commit_are_checked_in_order() {
        let store = InMemoryStore::new();
        let err = store
            .apply(commit(
                "e",
                vec![
                    Operation::IncrementCounter {
                        name: "c".into(),
                        delta: i64::MAX,
                    },
                    Operation::IncrementCounter {
                        name: "c".into(),
                        delta: 1,
                    },
                ],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.remote_code(), Some(RemoteErrorCode::InvalidOperation));
        assert!(store.snapshot(&EntityId::new("e")).await.is_none());
    }

    #[tokio::test]
    async fn removing_last_member_drops_the_set() {
        let store = InMemoryStore::new();
        store
            .apply(commit(
                "e",
                vec![
                    Operation::AddSetMember {
                        name: "s".into(),
                        member: "m".into(),
                    },
                    Operation::RemoveSetMember {
                        name: "s".into(),
                        member: "m".into(),
                    },
                    Operation::RemoveSetMember {
                        name: "other".into(),
                        member: "m".into(),
                    },
                ],
            ))
            .await
            .unwrap();
        let snapshot = store.snapshot(&EntityId::new("e")).await.unwrap();
        assert!(snapshot.sets.is_empty());
    }

    #[tokio::test]
    async fn lost_ack_still_applies() {
        let store = InMemoryStore::new();
        store.fail_next_apply(Fault::LostAck);
        let err = store
            .apply(commit(
                "e",
                vec![Operation::IncrementCounter {
                    name: "c".into(),
                    delta: 1,
                }],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AdlError::StoreUnavailable(_)));
        let snapshot = store.snapshot(&EntityId::new("e")).await.unwrap();
        assert_eq!(snapshot.counters.get("c"), Some(&1));
    }

    #[tokio::test]
    async fn prefix_scan_stops_at_prefix_boundary() {
        let store = InMemoryStore::new();
        store
            .apply(commit(
                "e",
                ["pa", "propX", "propY", "pz"]
                    .into_iter()
                    .map(|n| Operation::WriteProperty {
                        name: n.into(),
                        value: n.to_lowercase(),
                    })
                    .collect(),
            ))
            .await
            .unwrap();
        let response = store
            .fetch(read("e", vec![Projection::properties_with_prefix("prop")]))
            .await
            .unwrap();
        assert_eq!(
            response.results,
            vec![ProjectionResult::PropertiesWithPrefix {
                prefix: "prop".into(),
                properties: vec![
                    ("propX".into(), "propx".into()),
                    ("propY".into(), "propy".into()),
                ],
            }]
        );
    }

    #[tokio::test]
    async fn empty_projection_name_is_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .fetch(read("e", vec![Projection::property("")]))
            .await
            .unwrap_err();
        assert_eq!(err.remote_code(), Some(RemoteErrorCode::InvalidProjection));
        assert_eq!(store.fetch_count(), 0);
    }
}

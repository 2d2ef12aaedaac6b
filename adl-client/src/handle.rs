//! Entity handles.
//!
//! An [`EntityHandle`] is the caller's view of one entity: a read cache
//! filled by [`read`](EntityHandle::read), a buffer of staged mutations and
//! [`commit`](EntityHandle::commit) to flush that buffer atomically.
//!
//! Handles are single-owner. Two handles for the same entity id share
//! nothing: neither sees the other's staged mutations, and a read through one
//! may return values older than a commit that just finished through the
//! other.

use crate::buffer::{Mutation, PendingMutations};
use crate::cache::{AttributeCache, Lookup};
use crate::codec;
use crate::config::ClientConfig;
use crate::context::RequestContext;
use crate::error::{AdlError, AdlResult};
use crate::projection::Projection;
use crate::protocol::{CommitRequest, CommitResponse, ReadRequest};
use crate::store::AttributeStore;
use adl_types::{EntityId, ListItem};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Entry point: opens entity handles against an injected store.
#[derive(Clone)]
pub struct AdlClient {
    store: Arc<dyn AttributeStore>,
    config: ClientConfig,
}

impl AdlClient {
    /// Creates a client with the default configuration.
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self::with_config(store, ClientConfig::default())
    }

    pub fn with_config(store: Arc<dyn AttributeStore>, config: ClientConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Opens a handle for `id`. No I/O; the entity need not exist.
    pub fn entity(&self, id: impl Into<EntityId>) -> EntityHandle {
        EntityHandle {
            id: id.into(),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            cache: AttributeCache::new(),
            pending: PendingMutations::new(),
            bound: false,
        }
    }
}

/// Lifecycle of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Just opened: nothing read, committed or staged yet.
    Unbound,
    /// No staged mutations.
    Clean,
    /// Mutations are staged and not yet committed.
    Dirty,
}

/// Runs one store round trip, bounded by cancellation and the timeout.
async fn round_trip<T, F>(ctx: &RequestContext, timeout_ms: u64, call: F) -> AdlResult<T>
where
    F: Future<Output = AdlResult<T>>,
{
    if ctx.is_cancelled() {
        return Err(AdlError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(AdlError::Cancelled),
        result = tokio::time::timeout(Duration::from_millis(timeout_ms), call) => {
            result.unwrap_or(Err(AdlError::Timeout(timeout_ms)))
        }
    }
}

/// A single entity's read cache and staged mutations.
pub struct EntityHandle {
    id: EntityId,
    store: Arc<dyn AttributeStore>,
    config: ClientConfig,
    cache: AttributeCache,
    pending: PendingMutations,
    bound: bool,
}

impl std::fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("cache", &self.cache)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl EntityHandle {
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn state(&self) -> HandleState {
        if !self.pending.is_empty() {
            HandleState::Dirty
        } else if self.bound {
            HandleState::Clean
        } else {
            HandleState::Unbound
        }
    }

    pub fn cache(&self) -> &AttributeCache {
        &self.cache
    }

    pub fn pending(&self) -> &PendingMutations {
        &self.pending
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Fetches every projection in one round trip and merges the results
    /// into the cache.
    ///
    /// Only entries named by `projections` change. On error the cache is
    /// left exactly as it was. Staged mutations are not visible here until
    /// committed.
    pub async fn read<I>(
        &mut self,
        ctx: &RequestContext,
        projections: I,
    ) -> AdlResult<&AttributeCache>
    where
        I: IntoIterator<Item = Projection>,
    {
        let projections: Vec<Projection> = projections.into_iter().collect();
        if projections.is_empty() {
            return Ok(&self.cache);
        }

        let request = ReadRequest::new(self.id.clone(), ctx.caller().clone(), projections.clone());
        let response = round_trip(ctx, self.config.request_timeout_ms, self.store.fetch(request))
            .await
            .inspect_err(|err| {
                warn!(entity = %self.id, error = %err, "read failed");
            })?;
        let update = codec::decode_read_response(&projections, response)?;

        debug!(
            entity = %self.id,
            user = %ctx.caller().user_id,
            projections = projections.len(),
            entries = update.len(),
            "read complete"
        );
        self.cache.merge(update);
        self.bound = true;
        Ok(&self.cache)
    }

    /// Cached property value; `""` if never fetched or absent.
    pub fn property(&self, name: &str) -> &str {
        self.cache.property(name).or_zero()
    }

    /// Cached metadata string; `""` if never fetched or absent.
    pub fn metadata(&self, name: &str) -> &str {
        self.cache.metadata(name).or_zero()
    }

    /// Cached counter value; 0 if never fetched or never written.
    pub fn counter(&self, name: &str) -> i64 {
        self.cache.counter(name).or_zero()
    }

    /// Cached set members in order; empty if never fetched or absent.
    pub fn set(&self, name: &str) -> Vec<&str> {
        self.cache
            .set(name)
            .present()
            .map(|members| members.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Cached list items from the last range read of `name`.
    pub fn list(&self, name: &str) -> &[ListItem] {
        self.cache.list(name).or_zero()
    }

    pub fn lookup_property(&self, name: &str) -> Lookup<&str> {
        self.cache.property(name)
    }

    pub fn lookup_metadata(&self, name: &str) -> Lookup<&str> {
        self.cache.metadata(name)
    }

    pub fn lookup_counter(&self, name: &str) -> Lookup<i64> {
        self.cache.counter(name)
    }

    pub fn lookup_set(&self, name: &str) -> Lookup<&BTreeSet<String>> {
        self.cache.set(name)
    }

    pub fn lookup_list(&self, name: &str) -> Lookup<&[ListItem]> {
        self.cache.list(name)
    }

    // ── Mutations ────────────────────────────────────────────────

    pub fn write_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pending.stage(Mutation::WriteProperty {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn write_metadata(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pending.stage(Mutation::WriteMetadata {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Stages `+1` on a counter.
    pub fn increment_counter(&mut self, name: impl Into<String>) {
        self.increment_counter_by(name, 1);
    }

    /// Stages a relative change; negative deltas decrement.
    pub fn increment_counter_by(&mut self, name: impl Into<String>, delta: i64) {
        self.pending.stage(Mutation::IncrementCounter {
            name: name.into(),
            delta,
        });
    }

    pub fn add_set_item(&mut self, name: impl Into<String>, member: impl Into<String>) {
        self.pending.stage(Mutation::AddSetItem {
            name: name.into(),
            member: member.into(),
        });
    }

    pub fn remove_set_item(&mut self, name: impl Into<String>, member: impl Into<String>) {
        self.pending.stage(Mutation::RemoveSetItem {
            name: name.into(),
            member: member.into(),
        });
    }

    /// Stages `key -> value` in a list; an existing key keeps its position
    /// and takes the new value.
    pub fn add_list_item(
        &mut self,
        list: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.pending.stage(Mutation::AddListItem {
            list: list.into(),
            key: key.into(),
            value: value.into(),
        });
    }

    /// Drops every staged mutation without sending anything.
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    // ── Commit ───────────────────────────────────────────────────

    /// Sends every staged mutation in one request that the store applies
    /// atomically.
    ///
    /// The buffer is emptied before the request is sent, so it is empty
    /// afterwards whether the commit succeeded or not: **staged mutations
    /// are lost on failure**. Nothing is retried. A `StoreUnavailable` may
    /// arrive after the store applied the commit, so blindly repeating the
    /// same mutations can apply counter deltas twice.
    ///
    /// The cache is not refreshed; read again to observe committed values.
    /// Committing an empty buffer succeeds without contacting the store.
    ///
    /// Two failures are raised by the client itself, before any I/O:
    /// [`AdlError::TooManyOperations`] when the buffer encodes to more than
    /// `max_operations_per_commit` operations, and
    /// [`AdlError::CounterOverflow`] when a counter's net delta leaves the
    /// `i64` range. The buffer is cleared in both cases too.
    pub async fn commit(&mut self, ctx: &RequestContext) -> AdlResult<CommitResponse> {
        let staged_calls = self.pending.staged_calls();
        let drained = self.pending.drain();
        self.bound = true;
        let operations = drained.inspect_err(|err| {
            warn!(
                entity = %self.id,
                error = %err,
                "commit rejected locally; staged mutations discarded"
            );
        })?;

        if operations.is_empty() {
            debug!(entity = %self.id, staged_calls, "nothing to commit");
            return Ok(CommitResponse::default());
        }

        let count = operations.len();
        let limit = self.config.max_operations_per_commit;
        if count > limit {
            let err = AdlError::TooManyOperations { count, limit };
            warn!(
                entity = %self.id,
                operations = count,
                error = %err,
                "commit rejected locally; staged mutations discarded"
            );
            return Err(err);
        }

        let request = CommitRequest::new(self.id.clone(), ctx.caller().clone(), operations);
        match round_trip(ctx, self.config.request_timeout_ms, self.store.apply(request)).await {
            Ok(response) => {
                debug!(
                    entity = %self.id,
                    user = %ctx.caller().user_id,
                    staged_calls,
                    applied = response.applied,
                    "commit applied"
                );
                Ok(response)
            }
            Err(err) => {
                warn!(
                    entity = %self.id,
                    operations = count,
                    error = %err,
                    "commit failed; staged mutations discarded"
                );
                Err(err)
            }
        }
    }
}

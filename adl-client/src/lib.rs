//! Client for the ADL entity attribute store.
//!
//! An entity is a bag of named attributes of five kinds: properties (with an
//! optional metadata string each), counters, sets and ordered lists. The
//! client reads a *projection* of those attributes into a local cache, stages
//! mutations locally and persists them in one atomic commit.
//!
//! # Components
//!
//! - **Projection**: pure descriptions of what to fetch
//! - **Codec**: wire operations, response decoding and framing
//! - **Buffer**: per-entity staging with one merge rule per attribute kind
//! - **Handle**: cache + buffer + read/commit for one entity
//! - **Store**: the [`AttributeStore`] boundary and an [`InMemoryStore`]
//!
//! # Flow
//!
//! 1. Open a handle from an [`AdlClient`] (no I/O)
//! 2. `read` a batch of projections in one round trip
//! 3. Query the cache, stage mutations
//! 4. `commit` everything at once; the buffer is cleared either way
//!
//! # Example
//!
//! ```
//! use adl_client::{AdlClient, InMemoryStore, Projection, RequestContext};
//! use std::sync::Arc;
//!
//! # tokio_test_block_on(async {
//! let client = AdlClient::new(Arc::new(InMemoryStore::new()));
//! let ctx = RequestContext::background();
//!
//! let mut entity = client.entity("THIS-IS-A-FID");
//! entity.increment_counter("visits");
//! entity.add_set_item("tags", "blue");
//! entity.commit(&ctx).await.unwrap();
//!
//! entity
//!     .read(&ctx, [Projection::counter("visits"), Projection::set("tags")])
//!     .await
//!     .unwrap();
//! assert_eq!(entity.counter("visits"), 1);
//! assert_eq!(entity.set("tags"), vec!["blue"]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread()
//! #         .enable_all()
//! #         .build()
//! #         .unwrap()
//! #         .block_on(f)
//! # }
//! ```

pub mod buffer;
mod cache;
pub mod codec;
mod config;
mod context;
mod error;
mod handle;
pub mod memory;
mod projection;
pub mod protocol;
mod store;

pub use buffer::{AttributeKey, Mutation, PendingMutations, SetOp, Staged};
pub use cache::{AttributeCache, CacheEntry, CacheUpdate, Lookup};
pub use config::ClientConfig;
pub use context::{CancelHandle, RequestContext};
pub use error::{AdlError, AdlResult, RemoteErrorCode};
pub use handle::{AdlClient, EntityHandle, HandleState};
pub use memory::{EntitySnapshot, Fault, InMemoryStore, StoreLimits};
pub use projection::{ListRange, Projection};
pub use protocol::{
    CommitRequest, CommitResponse, Operation, PROTOCOL_VERSION, ProjectionResult, ReadRequest,
    ReadResponse,
};
pub use store::AttributeStore;

pub use adl_types::{AttributeKind, Caller, EntityId, ListItem};

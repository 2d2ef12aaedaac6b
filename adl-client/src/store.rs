//! Store boundary.
//!
//! The client talks to the attribute store only through [`AttributeStore`],
//! injected into [`AdlClient`](crate::AdlClient). Transport, authentication
//! and discovery live behind implementations of this trait.

use crate::error::AdlResult;
use crate::protocol::{CommitRequest, CommitResponse, ReadRequest, ReadResponse};
use async_trait::async_trait;

/// A remote entity attribute store.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Resolves every projection of the request in one pass.
    ///
    /// Results are returned in projection order.
    async fn fetch(&self, request: ReadRequest) -> AdlResult<ReadResponse>;

    /// Applies every operation of the request, or none of them.
    ///
    /// Dropping the returned future before it completes must leave the
    /// entity unchanged.
    async fn apply(&self, request: CommitRequest) -> AdlResult<CommitResponse>;
}

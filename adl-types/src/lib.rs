//! Core type definitions for the ADL client.
//!
//! This crate defines the plain data shared between the client and any
//! store implementation:
//! - Entity identifiers and the authenticated caller
//! - Attribute kinds
//! - Ordered list entries

mod ids;
mod value;

pub use ids::{Caller, EntityId};
pub use value::{AttributeKind, ListItem};

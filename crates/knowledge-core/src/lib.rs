//! knowledge-core: Shared domain types and error handling for the knowledge graph.
//!
//! This crate provides the types exchanged with the persistence layer:
//! - Node and relationship entities plus their creation/update inputs
//! - The closed node and relationship type enumerations, which double as
//!   graph labels and therefore act as the allow-list for query construction
//! - Tag de-duplication
//! - Common error types

pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::{
    dedupe_tags, NewNode, NewRelationship, Node, NodeId, NodeType, NodeUpdate,
    RelationshipId, RelationshipType,
};

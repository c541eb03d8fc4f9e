//! Knowledge Graph: Neo4j persistence for the knowledge domain model.
//!
//! Every repository operation issues exactly one parameterized Cypher
//! statement inside one scoped transaction. Node and relationship types are
//! spliced into statements as labels, so only the closed enumerations from
//! `knowledge-core` ever reach query text.

pub mod client;
pub mod mutations;
pub mod queries;
pub mod repository;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use repository::NodeRepository;
pub use store::{AccessMode, GraphStore, Param, Record, Statement};

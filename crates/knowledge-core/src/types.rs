//! Core domain types for the knowledge graph.
//!
//! Nodes are typed knowledge items carrying free-form content and tags;
//! relationships are typed directed edges between nodes. Identifiers are
//! generated by the graph store and treated as opaque strings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Identifiers ───────────────────────────────────────────────────

/// Store-generated identifier of a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Store-generated identifier of a single relationship edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RelationshipId(pub String);

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RelationshipId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RelationshipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Node Types ────────────────────────────────────────────────────

/// The kind of a knowledge node.
///
/// Each variant is also applied to the node as a second graph label, so the
/// string forms below are the only values ever interpolated into Cypher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeType {
    Concept,
    Idea,
    Note,
    Question,
    Resource,
    Person,
    Project,
}

impl NodeType {
    pub const ALL: [NodeType; 7] = [
        NodeType::Concept,
        NodeType::Idea,
        NodeType::Note,
        NodeType::Question,
        NodeType::Resource,
        NodeType::Person,
        NodeType::Project,
    ];

    /// Graph label and `type` property value for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::Concept => "Concept",
            NodeType::Idea => "Idea",
            NodeType::Note => "Note",
            NodeType::Question => "Question",
            NodeType::Resource => "Resource",
            NodeType::Person => "Person",
            NodeType::Project => "Project",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| CoreError::UnknownNodeType(s.to_string()))
    }
}

/// A persisted knowledge node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub content: String,
    pub node_type: NodeType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Input for creating a node. Timestamps are stamped by the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewNode {
    pub title: String,
    pub content: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Full replacement of a node's mutable fields, including its tag set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeUpdate {
    pub id: NodeId,
    pub title: String,
    pub content: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&Node> for NodeUpdate {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            title: node.title.clone(),
            content: node.content.clone(),
            node_type: node.node_type,
            tags: node.tags.clone(),
        }
    }
}

// ── Relationship Types ────────────────────────────────────────────

/// The type of a directed relationship between two nodes.
///
/// `HAS_TAG` is reserved for tag edges and deliberately absent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    RelatesTo,
    DependsOn,
    PartOf,
    References,
    Supports,
    Contradicts,
    DerivedFrom,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 7] = [
        RelationshipType::RelatesTo,
        RelationshipType::DependsOn,
        RelationshipType::PartOf,
        RelationshipType::References,
        RelationshipType::Supports,
        RelationshipType::Contradicts,
        RelationshipType::DerivedFrom,
    ];

    /// Convert to its Cypher relationship type string.
    pub fn as_cypher(&self) -> &'static str {
        match self {
            RelationshipType::RelatesTo => "RELATES_TO",
            RelationshipType::DependsOn => "DEPENDS_ON",
            RelationshipType::PartOf => "PART_OF",
            RelationshipType::References => "REFERENCES",
            RelationshipType::Supports => "SUPPORTS",
            RelationshipType::Contradicts => "CONTRADICTS",
            RelationshipType::DerivedFrom => "DERIVED_FROM",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cypher())
    }
}

impl FromStr for RelationshipType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationshipType::ALL
            .into_iter()
            .find(|t| t.as_cypher() == s)
            .ok_or_else(|| CoreError::UnknownRelationshipType(s.to_string()))
    }
}

/// Input for creating one edge per target from a single source node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRelationship {
    pub source_id: NodeId,
    pub target_ids: Vec<NodeId>,
    pub description: String,
    pub rel_type: RelationshipType,
}

// ── Tags ──────────────────────────────────────────────────────────

/// Collapse a tag list into set semantics.
///
/// Exact duplicates are removed keeping the first occurrence. Names are
/// otherwise stored as given.
pub fn dedupe_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(tag) {
            out.push(tag.clone());
        }
    }
    out
}

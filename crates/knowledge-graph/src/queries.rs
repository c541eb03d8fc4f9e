//! Read operations for the knowledge graph.

use knowledge_core::{Node, NodeId, NodeType};

use crate::client::GraphError;
use crate::repository::{at_most_one, NodeRepository};
use crate::store::{AccessMode, GraphStore, Record, Statement};

impl<S: GraphStore> NodeRepository<S> {
    /// Get a node by id, including every tag linked to it.
    pub async fn get_node_by_id(&self, id: &NodeId) -> Result<Node, GraphError> {
        let rows = self
            .execute(AccessMode::Read, get_node_statement(id))
            .await?;

        match at_most_one("get_node_by_id", rows)? {
            Some(row) => decode_node(&row),
            None => Err(GraphError::NotFound {
                entity: "Node",
                id: id.0.clone(),
            }),
        }
    }
}

fn get_node_statement(id: &NodeId) -> Statement {
    Statement::new(
        "get_node_by_id",
        "MATCH (n:Node {id: $id})
         OPTIONAL MATCH (n)-[:HAS_TAG]->(t:Tag)
         RETURN n.id AS id, n.title AS title, n.content AS content, n.type AS type,
                n.created_at AS created_at, n.updated_at AS updated_at,
                collect(DISTINCT t.name) AS tags",
    )
    .param("id", id.0.clone())
}

/// Decode a node row, validating the shape of every column.
pub fn decode_node<R: Record>(row: &R) -> Result<Node, GraphError> {
    let raw_type = row.string("type")?;
    let node_type = raw_type
        .parse::<NodeType>()
        .map_err(|e| GraphError::decode("type", "node type", e))?;

    Ok(Node {
        id: NodeId(row.string("id")?),
        title: row.string("title")?,
        content: row.string("content")?,
        node_type,
        created_at: row.datetime("created_at")?,
        updated_at: row.datetime("updated_at")?,
        tags: row.string_list("tags")?,
    })
}

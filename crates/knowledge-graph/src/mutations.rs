//! Write operations for the knowledge graph.
//!
//! Each operation is a single statement run in its own write transaction.
//! Tags are merged by name so a tag vertex is shared by every node that
//! references it; tag vertices are never deleted here, even once orphaned.

use chrono::{DateTime, Utc};

use knowledge_core::{
    dedupe_tags, NewNode, NewRelationship, NodeId, NodeType, NodeUpdate, RelationshipId,
};

use crate::client::GraphError;
use crate::repository::{at_most_one, timestamp, NodeRepository};
use crate::store::{AccessMode, GraphStore, Record, Statement};

impl<S: GraphStore> NodeRepository<S> {
    // ── Nodes ────────────────────────────────────────────────────

    /// Create a node with its type label and tag links.
    ///
    /// `created_at` and `updated_at` are stamped here, not by the caller.
    pub async fn create_node(&self, node: &NewNode) -> Result<NodeId, GraphError> {
        let stmt = create_node_statement(node, Utc::now());
        let rows = self.execute(AccessMode::Write, stmt).await?;

        let row = at_most_one("create_node", rows)?.ok_or(GraphError::UnexpectedRows {
            statement: "create_node",
            expected: 1,
            actual: 0,
        })?;
        let id = NodeId(row.string("id")?);

        tracing::info!(node_id = %id, node_type = %node.node_type, "Created node");
        Ok(id)
    }

    /// Overwrite a node's fields and replace its tag set wholesale.
    pub async fn update_node(&self, update: &NodeUpdate) -> Result<(), GraphError> {
        let stmt = update_node_statement(update, Utc::now());
        let rows = self.execute(AccessMode::Write, stmt).await?;

        if at_most_one("update_node", rows)?.is_none() {
            return Err(GraphError::NotFound {
                entity: "Node",
                id: update.id.0.clone(),
            });
        }

        tracing::info!(node_id = %update.id, node_type = %update.node_type, "Updated node");
        Ok(())
    }

    /// Delete a node together with every edge attached to it.
    ///
    /// Deleting an unknown id is not an error.
    pub async fn delete_node(&self, id: &NodeId) -> Result<(), GraphError> {
        let stmt = Statement::new(
            "delete_node",
            "MATCH (n:Node {id: $id})
             DETACH DELETE n",
        )
        .param("id", id.0.clone());

        self.execute(AccessMode::Write, stmt).await?;
        tracing::info!(node_id = %id, "Deleted node");
        Ok(())
    }

    // ── Relationships ────────────────────────────────────────────

    /// Create one edge from the source to every target that exists.
    ///
    /// Unknown targets are skipped, so the result may be shorter than
    /// `target_ids`. An unknown source is reported as not found.
    pub async fn create_relationship(
        &self,
        rel: &NewRelationship,
    ) -> Result<Vec<RelationshipId>, GraphError> {
        if rel.target_ids.is_empty() {
            return Err(GraphError::InvalidInput(
                "relationship needs at least one target".to_string(),
            ));
        }

        let stmt = create_relationship_statement(rel, Utc::now());
        let rows = self.execute(AccessMode::Write, stmt).await?;

        let row = at_most_one("create_relationship", rows)?.ok_or(
            GraphError::UnexpectedRows {
                statement: "create_relationship",
                expected: 1,
                actual: 0,
            },
        )?;
        if !row.boolean("source_found")? {
            return Err(GraphError::NotFound {
                entity: "Node",
                id: rel.source_id.0.clone(),
            });
        }

        let ids: Vec<RelationshipId> = row
            .string_list("ids")?
            .into_iter()
            .map(RelationshipId)
            .collect();

        let skipped = rel.target_ids.len().saturating_sub(ids.len());
        if skipped > 0 {
            tracing::debug!(source_id = %rel.source_id, skipped, "Skipped unknown targets");
        }
        tracing::info!(
            source_id = %rel.source_id,
            rel_type = %rel.rel_type,
            created = ids.len(),
            "Created relationships"
        );
        Ok(ids)
    }

    /// Delete a single edge by id, whatever its type or direction.
    ///
    /// Deleting an unknown id is not an error.
    pub async fn delete_relationship(&self, id: &RelationshipId) -> Result<(), GraphError> {
        let stmt = Statement::new(
            "delete_relationship",
            "MATCH ()-[r {id: $id}]-()
             DELETE r",
        )
        .param("id", id.0.clone());

        self.execute(AccessMode::Write, stmt).await?;
        tracing::info!(relationship_id = %id, "Deleted relationship");
        Ok(())
    }
}

// ── Statements ───────────────────────────────────────────────────

fn create_node_statement(node: &NewNode, now: DateTime<Utc>) -> Statement {
    let label = node.node_type.label();
    let cypher = format!(
        "CREATE (n:Node {{
           id: randomUUID(),
           title: $title,
           content: $content,
           type: $type,
           created_at: datetime($created_at),
           updated_at: datetime($updated_at)
         }})
         SET n:{label}
         FOREACH (tag IN $tags | MERGE (t:Tag {{name: tag}}) MERGE (n)-[:HAS_TAG]->(t))
         RETURN n.id AS id"
    );

    let now = timestamp(now);
    Statement::new("create_node", cypher)
        .param("title", node.title.clone())
        .param("content", node.content.clone())
        .param("type", label)
        .param("created_at", now.clone())
        .param("updated_at", now)
        .param("tags", dedupe_tags(&node.tags))
}

fn update_node_statement(update: &NodeUpdate, now: DateTime<Utc>) -> Statement {
    let label = update.node_type.label();
    let all_labels = NodeType::ALL.map(|t| t.label()).join(":");
    // The stored updated_at only ever moves forward, even if the clock does not.
    let cypher = format!(
        "MATCH (n:Node {{id: $id}})
         SET n.title = $title,
             n.content = $content,
             n.type = $type,
             n.updated_at = CASE
               WHEN datetime($updated_at) > n.updated_at THEN datetime($updated_at)
               ELSE n.updated_at + duration({{microseconds: 1}})
             END
         REMOVE n:{all_labels}
         SET n:{label}
         WITH n
         OPTIONAL MATCH (n)-[r:HAS_TAG]->(:Tag)
         DELETE r
         WITH DISTINCT n
         FOREACH (tag IN $tags | MERGE (t:Tag {{name: tag}}) MERGE (n)-[:HAS_TAG]->(t))
         RETURN n.id AS id"
    );

    Statement::new("update_node", cypher)
        .param("id", update.id.0.clone())
        .param("title", update.title.clone())
        .param("content", update.content.clone())
        .param("type", label)
        .param("updated_at", timestamp(now))
        .param("tags", dedupe_tags(&update.tags))
}

fn create_relationship_statement(rel: &NewRelationship, now: DateTime<Utc>) -> Statement {
    let rel_type = rel.rel_type.as_cypher();
    let cypher = format!(
        "OPTIONAL MATCH (source:Node {{id: $source_id}})
         CALL {{
           WITH source
           WITH source WHERE source IS NOT NULL
           UNWIND $target_ids AS target_id
           MATCH (target:Node {{id: target_id}})
           CREATE (source)-[r:{rel_type} {{
             id: randomUUID(),
             description: $description,
             created_at: datetime($created_at)
           }}]->(target)
           RETURN collect(r.id) AS ids
         }}
         RETURN source IS NOT NULL AS source_found, ids"
    );

    let target_ids: Vec<String> = rel.target_ids.iter().map(|id| id.0.clone()).collect();
    Statement::new("create_relationship", cypher)
        .param("source_id", rel.source_id.0.clone())
        .param("target_ids", target_ids)
        .param("description", rel.description.clone())
        .param("created_at", timestamp(now))
}

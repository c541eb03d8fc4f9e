//! Repository behavior against a scripted in-memory store.
//!
//! The store records every statement it receives and replays canned rows,
//! so these tests cover query selection, result decoding and error mapping
//! without a running Neo4j.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use knowledge_core::{
    NewNode, NewRelationship, NodeId, NodeType, NodeUpdate, RelationshipId, RelationshipType,
};
use knowledge_graph::{AccessMode, GraphError, GraphStore, NodeRepository, Param, Record, Statement};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Time(DateTime<Utc>),
    List(Vec<String>),
    Bool(bool),
    Int(i64),
}

#[derive(Debug, Clone, Default)]
struct FakeRow(HashMap<String, Value>);

impl FakeRow {
    fn with(mut self, column: &str, value: Value) -> Self {
        self.0.insert(column.to_string(), value);
        self
    }
}

fn mismatch(column: &str, expected: &'static str) -> GraphError {
    GraphError::Decode {
        column: column.to_string(),
        expected,
        reason: "type mismatch".to_string(),
    }
}

impl Record for FakeRow {
    fn string(&self, column: &str) -> Result<String, GraphError> {
        match self.0.get(column) {
            Some(Value::Str(s)) => Ok(s.clone()),
            _ => Err(mismatch(column, "string")),
        }
    }

    fn datetime(&self, column: &str) -> Result<DateTime<Utc>, GraphError> {
        match self.0.get(column) {
            Some(Value::Time(t)) => Ok(*t),
            _ => Err(mismatch(column, "datetime")),
        }
    }

    fn string_list(&self, column: &str) -> Result<Vec<String>, GraphError> {
        match self.0.get(column) {
            Some(Value::List(v)) => Ok(v.clone()),
            _ => Err(mismatch(column, "list of strings")),
        }
    }

    fn boolean(&self, column: &str) -> Result<bool, GraphError> {
        match self.0.get(column) {
            Some(Value::Bool(b)) => Ok(*b),
            _ => Err(mismatch(column, "boolean")),
        }
    }
}

#[derive(Default)]
struct ScriptedStore {
    responses: Mutex<VecDeque<Result<Vec<FakeRow>, GraphError>>>,
    seen: Mutex<Vec<(AccessMode, Statement)>>,
    delay: Option<Duration>,
}

impl ScriptedStore {
    fn replying(responses: Vec<Result<Vec<FakeRow>, GraphError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    fn seen(&self) -> Vec<(AccessMode, Statement)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for ScriptedStore {
    type Row = FakeRow;

    async fn execute(
        &self,
        mode: AccessMode,
        statement: Statement,
    ) -> Result<Vec<FakeRow>, GraphError> {
        self.seen.lock().unwrap().push((mode, statement));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn repo(
    responses: Vec<Result<Vec<FakeRow>, GraphError>>,
) -> (NodeRepository<Arc<ScriptedStore>>, Arc<ScriptedStore>) {
    let store = Arc::new(ScriptedStore::replying(responses));
    (NodeRepository::new(store.clone()), store)
}

fn ts(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap()
}

fn node_row(id: &str, node_type: &str, tags: &[&str]) -> FakeRow {
    FakeRow::default()
        .with("id", Value::Str(id.to_string()))
        .with("title", Value::Str("Traits".to_string()))
        .with("content", Value::Str("Shared behavior".to_string()))
        .with("type", Value::Str(node_type.to_string()))
        .with("created_at", Value::Time(ts(8)))
        .with("updated_at", Value::Time(ts(9)))
        .with(
            "tags",
            Value::List(tags.iter().map(|t| t.to_string()).collect()),
        )
}

fn new_node(tags: &[&str]) -> NewNode {
    NewNode {
        title: "Traits".to_string(),
        content: "Shared behavior".to_string(),
        node_type: NodeType::Concept,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn relationship(targets: &[&str]) -> NewRelationship {
    NewRelationship {
        source_id: NodeId::from("src"),
        target_ids: targets.iter().map(|t| NodeId::from(*t)).collect(),
        description: "explains".to_string(),
        rel_type: RelationshipType::References,
    }
}

// ── CreateNode ───────────────────────────────────────────────────

#[tokio::test]
async fn create_node_returns_store_generated_id() {
    let (repo, store) = repo(vec![Ok(vec![
        FakeRow::default().with("id", Value::Str("gen-1".to_string()))
    ])]);

    let id = repo.create_node(&new_node(&["rust", "rust", "traits"])).await.unwrap();
    assert_eq!(id, NodeId::from("gen-1"));

    let seen = store.seen();
    assert_eq!(seen.len(), 1);
    let (mode, stmt) = &seen[0];
    assert_eq!(*mode, AccessMode::Write);
    assert!(stmt.cypher.contains("SET n:Concept"));
    assert_eq!(
        stmt.get_param("tags"),
        Some(&Param::TextList(vec!["rust".to_string(), "traits".to_string()]))
    );
}

#[tokio::test]
async fn create_node_binds_tag_names_verbatim() {
    let (repo, store) = repo(vec![Ok(vec![
        FakeRow::default().with("id", Value::Str("gen-3".to_string()))
    ])]);

    repo.create_node(&new_node(&[" spaced ", "", "c++", " spaced "])).await.unwrap();

    let seen = store.seen();
    let (_, stmt) = &seen[0];
    assert_eq!(
        stmt.get_param("tags"),
        Some(&Param::TextList(vec![
            " spaced ".to_string(),
            String::new(),
            "c++".to_string(),
        ]))
    );
}

#[tokio::test]
async fn create_node_stamps_equal_timestamps() {
    let (repo, store) = repo(vec![Ok(vec![
        FakeRow::default().with("id", Value::Str("gen-2".to_string()))
    ])]);
    let before = Utc::now();
    repo.create_node(&new_node(&[])).await.unwrap();
    let after = Utc::now();

    let seen = store.seen();
    let (_, stmt) = &seen[0];
    let Some(Param::Text(created)) = stmt.get_param("created_at") else {
        panic!("created_at not bound as text");
    };
    assert_eq!(stmt.get_param("updated_at"), stmt.get_param("created_at"));
    let created = DateTime::parse_from_rfc3339(created)
        .unwrap()
        .with_timezone(&Utc);
    // Micros truncation can put the stamp up to 1µs before `before`.
    assert!(created >= before - chrono::Duration::microseconds(1));
    assert!(created <= after);
}

#[tokio::test]
async fn create_node_without_row_is_an_error() {
    let (repo, _) = repo(vec![Ok(vec![])]);
    let err = repo.create_node(&new_node(&[])).await.unwrap_err();
    assert!(matches!(err, GraphError::UnexpectedRows { actual: 0, .. }));
}

#[tokio::test]
async fn store_failure_propagates_unmodified() {
    let (repo, _) = repo(vec![Err(GraphError::Connection("refused".to_string()))]);
    let err = repo.create_node(&new_node(&[])).await.unwrap_err();
    assert!(matches!(err, GraphError::Connection(ref m) if m == "refused"));
}

// ── GetNodeByID ──────────────────────────────────────────────────

#[tokio::test]
async fn get_node_decodes_all_fields() {
    let (repo, store) = repo(vec![Ok(vec![node_row("n-1", "Idea", &["a", "b"])])]);

    let node = repo.get_node_by_id(&NodeId::from("n-1")).await.unwrap();
    assert_eq!(node.id, NodeId::from("n-1"));
    assert_eq!(node.title, "Traits");
    assert_eq!(node.content, "Shared behavior");
    assert_eq!(node.node_type, NodeType::Idea);
    assert_eq!(node.created_at, ts(8));
    assert_eq!(node.updated_at, ts(9));
    assert_eq!(node.tags, vec!["a", "b"]);

    assert_eq!(store.seen()[0].0, AccessMode::Read);
}

#[tokio::test]
async fn get_node_without_tags_yields_empty_collection() {
    let (repo, _) = repo(vec![Ok(vec![node_row("n-1", "Note", &[])])]);
    let node = repo.get_node_by_id(&NodeId::from("n-1")).await.unwrap();
    assert!(node.tags.is_empty());
}

#[tokio::test]
async fn get_missing_node_is_not_found() {
    let (repo, _) = repo(vec![Ok(vec![])]);
    let err = repo.get_node_by_id(&NodeId::from("nope")).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, GraphError::NotFound { entity: "Node", ref id } if id == "nope"));
}

#[tokio::test]
async fn get_node_rejects_wrong_column_shape() {
    let row = node_row("n-1", "Idea", &[]).with("tags", Value::Str("a,b".to_string()));
    let (repo, _) = repo(vec![Ok(vec![row])]);

    let err = repo.get_node_by_id(&NodeId::from("n-1")).await.unwrap_err();
    assert!(matches!(err, GraphError::Decode { ref column, .. } if column == "tags"));
}

#[tokio::test]
async fn get_node_rejects_unknown_stored_type() {
    let (repo, _) = repo(vec![Ok(vec![node_row("n-1", "Admin", &[])])]);
    let err = repo.get_node_by_id(&NodeId::from("n-1")).await.unwrap_err();
    assert!(matches!(err, GraphError::Decode { ref column, .. } if column == "type"));
}

#[tokio::test]
async fn get_node_rejects_duplicate_rows() {
    let (repo, _) = repo(vec![Ok(vec![
        node_row("n-1", "Idea", &[]),
        node_row("n-1", "Idea", &[]),
    ])]);
    let err = repo.get_node_by_id(&NodeId::from("n-1")).await.unwrap_err();
    assert!(matches!(err, GraphError::UnexpectedRows { actual: 2, .. }));
}

// ── UpdateNode ───────────────────────────────────────────────────

#[tokio::test]
async fn update_node_binds_replacement_fields() {
    let (repo, store) = repo(vec![Ok(vec![
        FakeRow::default().with("id", Value::Str("n-1".to_string()))
    ])]);

    let update = NodeUpdate {
        id: NodeId::from("n-1"),
        title: "Generics".to_string(),
        content: "Monomorphization".to_string(),
        node_type: NodeType::Resource,
        tags: vec!["A".to_string(), "B".to_string()],
    };
    repo.update_node(&update).await.unwrap();

    let seen = store.seen();
    let (mode, stmt) = &seen[0];
    assert_eq!(*mode, AccessMode::Write);
    assert!(stmt.cypher.contains("SET n:Resource"));
    assert_eq!(stmt.get_param("id"), Some(&Param::Text("n-1".to_string())));
    assert_eq!(stmt.get_param("type"), Some(&Param::Text("Resource".to_string())));
    assert_eq!(
        stmt.get_param("tags"),
        Some(&Param::TextList(vec!["A".to_string(), "B".to_string()]))
    );
}

#[tokio::test]
async fn update_missing_node_is_not_found() {
    let (repo, _) = repo(vec![Ok(vec![])]);
    let update = NodeUpdate {
        id: NodeId::from("ghost"),
        title: String::new(),
        content: String::new(),
        node_type: NodeType::Note,
        tags: vec![],
    };
    let err = repo.update_node(&update).await.unwrap_err();
    assert!(err.is_not_found());
}

// ── CreateRelationship ───────────────────────────────────────────

#[tokio::test]
async fn create_relationship_skips_unknown_targets() {
    let row = FakeRow::default()
        .with("source_found", Value::Bool(true))
        .with("ids", Value::List(vec!["r-1".to_string(), "r-2".to_string()]));
    let (repo, store) = repo(vec![Ok(vec![row])]);

    let ids = repo
        .create_relationship(&relationship(&["t1", "missing", "t2"]))
        .await
        .unwrap();
    assert_eq!(ids, vec![RelationshipId::from("r-1"), RelationshipId::from("r-2")]);

    let seen = store.seen();
    let (mode, stmt) = &seen[0];
    assert_eq!(*mode, AccessMode::Write);
    assert!(stmt.cypher.contains("[r:REFERENCES {"));
    assert_eq!(
        stmt.get_param("target_ids"),
        Some(&Param::TextList(vec![
            "t1".to_string(),
            "missing".to_string(),
            "t2".to_string()
        ]))
    );
}

#[tokio::test]
async fn create_relationship_with_no_resolved_targets_is_empty() {
    let row = FakeRow::default()
        .with("source_found", Value::Bool(true))
        .with("ids", Value::List(vec![]));
    let (repo, _) = repo(vec![Ok(vec![row])]);

    let ids = repo.create_relationship(&relationship(&["x"])).await.unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn create_relationship_from_missing_source_is_not_found() {
    let row = FakeRow::default()
        .with("source_found", Value::Bool(false))
        .with("ids", Value::List(vec![]));
    let (repo, _) = repo(vec![Ok(vec![row])]);

    let err = repo.create_relationship(&relationship(&["t1"])).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound { ref id, .. } if id == "src"));
}

#[tokio::test]
async fn create_relationship_requires_targets() {
    let (repo, store) = repo(vec![]);
    let err = repo.create_relationship(&relationship(&[])).await.unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput(_)));
    assert!(store.seen().is_empty());
}

#[tokio::test]
async fn create_relationship_rejects_non_list_ids() {
    let row = FakeRow::default()
        .with("source_found", Value::Bool(true))
        .with("ids", Value::Int(2));
    let (repo, _) = repo(vec![Ok(vec![row])]);

    let err = repo.create_relationship(&relationship(&["t1"])).await.unwrap_err();
    assert!(matches!(err, GraphError::Decode { ref column, .. } if column == "ids"));
}

// ── Deletes ──────────────────────────────────────────────────────

#[tokio::test]
async fn deletes_are_idempotent() {
    let (repo, store) = repo(vec![Ok(vec![]), Ok(vec![]), Ok(vec![])]);

    repo.delete_node(&NodeId::from("n-1")).await.unwrap();
    repo.delete_node(&NodeId::from("n-1")).await.unwrap();
    repo.delete_relationship(&RelationshipId::from("r-1")).await.unwrap();

    let seen = store.seen();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].1.cypher.contains("DETACH DELETE n"));
    assert!(seen[2].1.cypher.contains("MATCH ()-[r {id: $id}]-()"));
    assert!(seen.iter().all(|(mode, _)| *mode == AccessMode::Write));
}

// ── Deadlines & concurrency ──────────────────────────────────────

#[tokio::test]
async fn slow_store_hits_deadline() {
    let store = ScriptedStore {
        delay: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let repo = NodeRepository::new(store).with_timeout(Duration::from_millis(20));

    let err = repo.delete_node(&NodeId::from("n-1")).await.unwrap_err();
    assert!(matches!(err, GraphError::Timeout { operation: "delete_node", .. }));
}

#[tokio::test]
async fn deadline_can_fire_after_write_reached_store() {
    let store = Arc::new(ScriptedStore {
        delay: Some(Duration::from_millis(500)),
        ..Default::default()
    });
    let repo = NodeRepository::new(store.clone()).with_timeout(Duration::from_millis(20));

    let err = repo.create_node(&new_node(&["rust"])).await.unwrap_err();
    assert!(matches!(err, GraphError::Timeout { operation: "create_node", .. }));

    // The statement was already delivered; the timeout says nothing about rollback.
    let seen = store.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1.name, "create_node");
}

#[tokio::test]
async fn repository_serves_concurrent_callers() {
    let responses = (0..8)
        .map(|i| Ok(vec![FakeRow::default().with("id", Value::Str(format!("gen-{i}")))]))
        .collect();
    let (repo, store) = repo(responses);
    let repo = Arc::new(repo);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create_node(&new_node(&["shared"])).await })
        })
        .collect();

    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap().unwrap());
    }
    ids.sort_by(|a, b| a.0.cmp(&b.0));
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(store.seen().len(), 8);
}

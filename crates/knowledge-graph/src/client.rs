//! Neo4j connection management and the transactional graph client.

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query, Row, Txn};
use serde::Deserialize;

use crate::store::{AccessMode, GraphStore, Statement};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Failed to decode column '{column}' as {expected}: {reason}")]
    Decode {
        column: String,
        expected: &'static str,
        reason: String,
    },

    #[error("Expected {expected} row(s) from {statement}, got {actual}")]
    UnexpectedRows {
        statement: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation {operation} timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },

    #[error("{source} (transaction release also failed: {release})")]
    Release {
        #[source]
        source: Box<GraphError>,
        release: String,
    },
}

impl GraphError {
    pub(crate) fn decode(column: &str, expected: &'static str, e: impl std::fmt::Display) -> Self {
        GraphError::Decode {
            column: column.to_string(),
            expected,
            reason: e.to_string(),
        }
    }

    /// True for zero-row lookups, including ones that also failed to release.
    pub fn is_not_found(&self) -> bool {
        match self {
            GraphError::NotFound { .. } => true,
            GraphError::Release { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "knowledge-dev".to_string()
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            database: default_database(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc). Holds no per-operation state: every call to
/// [`GraphStore::execute`] checks out its own connection and transaction.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, database = %config.database, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Get a reference to the underlying neo4rs Graph for direct operations.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Execute a write-only query outside the repository (fixtures, cleanup).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for GraphClient {
    type Row = Row;

    async fn execute(&self, mode: AccessMode, statement: Statement) -> Result<Vec<Row>, GraphError> {
        let name = statement.name;
        tracing::debug!(statement = name, ?mode, cypher = %statement.cypher, "Executing statement");

        let mut txn = self.graph.start_txn().await?;
        match drain(&mut txn, statement.into_query()).await {
            Ok(rows) => {
                txn.commit().await?;
                tracing::debug!(statement = name, rows = rows.len(), "Committed");
                Ok(rows)
            }
            Err(err) => Err(release_after_failure(name, txn, err).await),
        }
    }
}

/// Run a query and collect every row while the transaction is open.
async fn drain(txn: &mut Txn, query: Query) -> Result<Vec<Row>, GraphError> {
    let mut stream = txn.execute(query).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await? {
        rows.push(row);
    }
    Ok(rows)
}

/// Roll back after a failed statement, folding a rollback failure into the error.
///
/// The rollback-failure branch needs a server that drops the transaction
/// mid-flight and is not exercised by the test suite.
async fn release_after_failure(name: &'static str, txn: Txn, err: GraphError) -> GraphError {
    match txn.rollback().await {
        Ok(()) => err,
        Err(release) => {
            tracing::warn!(statement = name, error = %err, release_error = %release, "Rollback failed");
            GraphError::Release {
                source: Box::new(err),
                release: release.to_string(),
            }
        }
    }
}

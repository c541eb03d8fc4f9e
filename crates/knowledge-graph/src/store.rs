//! The transactional execution seam between the repository and Neo4j.
//!
//! The repository only builds [`Statement`]s and decodes [`Record`]s; running
//! a statement inside a scoped transaction is delegated to a [`GraphStore`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use neo4rs::{query, Query};

use crate::client::GraphError;

/// Whether a statement only reads or may also write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    TextList(Vec<String>),
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<Vec<String>> for Param {
    fn from(v: Vec<String>) -> Self {
        Param::TextList(v)
    }
}

/// One parameterized Cypher statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Operation name, used for logging.
    pub name: &'static str,
    pub cypher: String,
    pub params: Vec<(&'static str, Param)>,
}

impl Statement {
    pub fn new(name: &'static str, cypher: impl Into<String>) -> Self {
        Self {
            name,
            cypher: cypher.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<Param>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Look up a bound parameter by name.
    pub fn get_param(&self, key: &str) -> Option<&Param> {
        self.params.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Convert into a neo4rs query.
    pub fn into_query(self) -> Query {
        self.params
            .into_iter()
            .fold(query(&self.cypher), |q, (key, value)| match value {
                Param::Text(s) => q.param(key, s),
                Param::TextList(v) => q.param(key, v),
            })
    }
}

/// Executes a single statement inside exactly one scoped transaction.
///
/// Implementations must release the transaction on every exit path: commit
/// after all rows were drained, roll back on any failure, and report a failed
/// release as an error rather than aborting.
#[async_trait]
pub trait GraphStore: Send + Sync {
    type Row: Record + Send;

    async fn execute(
        &self,
        mode: AccessMode,
        statement: Statement,
    ) -> Result<Vec<Self::Row>, GraphError>;
}

#[async_trait]
impl<T: GraphStore + ?Sized> GraphStore for Arc<T> {
    type Row = T::Row;

    async fn execute(
        &self,
        mode: AccessMode,
        statement: Statement,
    ) -> Result<Vec<Self::Row>, GraphError> {
        (**self).execute(mode, statement).await
    }
}

/// Typed access to the columns of a result row.
///
/// Every accessor validates the column shape and returns
/// [`GraphError::Decode`] instead of assuming a type.
pub trait Record {
    fn string(&self, column: &str) -> Result<String, GraphError>;

    fn datetime(&self, column: &str) -> Result<DateTime<Utc>, GraphError>;

    fn string_list(&self, column: &str) -> Result<Vec<String>, GraphError>;

    fn boolean(&self, column: &str) -> Result<bool, GraphError>;
}

impl Record for neo4rs::Row {
    fn string(&self, column: &str) -> Result<String, GraphError> {
        self.get::<String>(column)
            .map_err(|e| GraphError::decode(column, "string", e))
    }

    fn datetime(&self, column: &str) -> Result<DateTime<Utc>, GraphError> {
        self.get::<DateTime<FixedOffset>>(column)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| GraphError::decode(column, "datetime", e))
    }

    fn string_list(&self, column: &str) -> Result<Vec<String>, GraphError> {
        self.get::<Vec<String>>(column)
            .map_err(|e| GraphError::decode(column, "list of strings", e))
    }

    fn boolean(&self, column: &str) -> Result<bool, GraphError> {
        self.get::<bool>(column)
            .map_err(|e| GraphError::decode(column, "boolean", e))
    }
}

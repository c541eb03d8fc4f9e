//! The node repository and its per-operation plumbing.
//!
//! Operation bodies live in [`crate::mutations`] and [`crate::queries`].

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::client::GraphError;
use crate::store::{AccessMode, GraphStore, Statement};

/// Maps knowledge nodes, tags and relationships onto the graph store.
///
/// Holds no mutable state, so a single instance can serve concurrent callers.
/// Concurrent writes to the same node or tag are serialized by the store.
#[derive(Clone)]
pub struct NodeRepository<S> {
    store: S,
    timeout: Option<Duration>,
}

impl<S: GraphStore> NodeRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Bound every operation by a deadline.
    ///
    /// A [`GraphError::Timeout`] does not mean the write was rolled back: the
    /// deadline can fire while the commit is in flight, so a retried create
    /// may produce a duplicate node or edge.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute one statement, honoring the configured deadline.
    pub(crate) async fn execute(
        &self,
        mode: AccessMode,
        statement: Statement,
    ) -> Result<Vec<S::Row>, GraphError> {
        let name = statement.name;
        self.bounded(name, self.store.execute(mode, statement)).await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, GraphError>>,
    ) -> Result<T, GraphError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(operation, millis, "Deadline exceeded");
                Err(GraphError::Timeout { operation, millis })
            }),
            None => fut.await,
        }
    }
}

/// Reduce a result set that must hold at most one row.
pub(crate) fn at_most_one<R>(statement: &'static str, rows: Vec<R>) -> Result<Option<R>, GraphError> {
    let actual = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), actual) {
        (None, _) => Ok(None),
        (Some(row), 1) => Ok(Some(row)),
        (Some(_), _) => Err(GraphError::UnexpectedRows {
            statement,
            expected: 1,
            actual,
        }),
    }
}

/// Wire format for timestamps: RFC3339, UTC, microsecond precision.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

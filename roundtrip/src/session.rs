//! The subset of session capabilities the workflow depends on.

use async_trait::async_trait;
use futures::future::BoxFuture;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::deserialize::DeserializationError;
use scylla::errors::{ExecutionError, NewSessionError, PrepareError, UseKeyspaceError};
use scylla::response::query_result::{IntoRowsResultError, QueryResult, RowsError};
use scylla::statement::prepared::PreparedStatement;
use scylla::statement::Statement;
use scylla::value::{CqlValue, Row};
use thiserror::Error;
use tracing::info;

use crate::config::WorkflowConfig;

/// Result of an asynchronous request that hasn't been awaited yet.
pub type RowsFuture<'a, E> = BoxFuture<'a, Result<Vec<Row>, E>>;

/// Session operations used by the workflow.
///
/// Implemented for [`Session`]; the seam exists so that the workflow
/// can be driven against an in-memory session in tests.
#[async_trait]
pub trait CqlSession: Send + Sync {
    /// Handle returned by [`CqlSession::prepare`].
    type Prepared: Send + Sync;

    /// Error of every operation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Executes an unprepared statement with bound values and waits for the result.
    ///
    /// Statements that don't return rows yield an empty vector.
    async fn execute(
        &self,
        statement: &Statement,
        values: Vec<CqlValue>,
    ) -> Result<Vec<Row>, Self::Error>;

    /// Executes a prepared statement with bound values and waits for the result.
    async fn execute_prepared(
        &self,
        prepared: &Self::Prepared,
        values: Vec<CqlValue>,
    ) -> Result<Vec<Row>, Self::Error>;

    /// Issues a statement without bound values and returns its pending result.
    fn execute_async(&self, statement: Statement) -> RowsFuture<'_, Self::Error>;

    /// Prepares a statement.
    async fn prepare(&self, cql: &str) -> Result<Self::Prepared, Self::Error>;

    /// Sets the keyspace used by unqualified statements.
    async fn use_keyspace(&self, keyspace: &str) -> Result<(), Self::Error>;
}

/// Error returned by the [`CqlSession`] implementation of [`Session`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScyllaSessionError {
    /// Executing a statement failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Preparing a statement failed.
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    /// `USE <keyspace>` failed.
    #[error(transparent)]
    UseKeyspace(#[from] UseKeyspaceError),

    /// Response claimed to carry rows, but its metadata couldn't be read.
    #[error(transparent)]
    IntoRows(#[from] IntoRowsResultError),

    /// Rows didn't type check as untyped [`Row`]s.
    #[error(transparent)]
    Rows(#[from] RowsError),

    /// A row couldn't be deserialized.
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
}

#[async_trait]
impl CqlSession for Session {
    type Prepared = PreparedStatement;
    type Error = ScyllaSessionError;

    async fn execute(
        &self,
        statement: &Statement,
        values: Vec<CqlValue>,
    ) -> Result<Vec<Row>, Self::Error> {
        let result = self.query_unpaged(statement.clone(), values).await?;
        collect_rows(result)
    }

    async fn execute_prepared(
        &self,
        prepared: &Self::Prepared,
        values: Vec<CqlValue>,
    ) -> Result<Vec<Row>, Self::Error> {
        let result = self.execute_unpaged(prepared, values).await?;
        collect_rows(result)
    }

    fn execute_async(&self, statement: Statement) -> RowsFuture<'_, Self::Error> {
        Box::pin(async move {
            let result = self.query_unpaged(statement, ()).await?;
            collect_rows(result)
        })
    }

    async fn prepare(&self, cql: &str) -> Result<Self::Prepared, Self::Error> {
        Ok(Session::prepare(self, cql).await?)
    }

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), Self::Error> {
        Ok(Session::use_keyspace(self, keyspace, false).await?)
    }
}

fn collect_rows(result: QueryResult) -> Result<Vec<Row>, ScyllaSessionError> {
    if !result.is_rows() {
        return Ok(Vec::new());
    }

    let rows_result = result.into_rows_result()?;
    let rows = rows_result
        .rows::<Row>()?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Opens a session to the configured seed nodes.
pub async fn connect(config: &WorkflowConfig) -> Result<Session, NewSessionError> {
    info!("Connecting to {:?} ...", config.known_nodes);

    SessionBuilder::new()
        .known_nodes(&config.known_nodes)
        .connection_timeout(config.connection_timeout)
        .build()
        .await
}

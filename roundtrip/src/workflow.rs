//! The ordered sequence of steps that provisions, populates, reads back
//! and tears down the demo schema.
//!
//! Every step is a separate method on [`Workflow`], so a caller can stop
//! after any of them and inspect the cluster. [`Workflow::run`] performs
//! all of them in the order of [`Step::ALL`].

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use scylla::statement::Statement;
use scylla::value::{CqlValue, Row};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::WorkflowConfig;
use crate::rows::{render_row, seed_rows, InsertStyle, SeedRow, HEADER, SEPARATOR};
use crate::schema;
use crate::session::CqlSession;
use crate::sink::ReportSink;

/// A named step of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Obtain a session from the seed nodes.
    Connect,
    /// Drop the keyspace left behind by a previous run, if any.
    CleanupStale,
    /// Create the keyspace.
    CreateKeyspace,
    /// Make the keyspace the session default.
    UseKeyspace,
    /// Create the table.
    CreateTable,
    /// Build the ad-hoc and the prepared insert.
    BuildStatements,
    /// Insert the seed rows.
    InsertRows,
    /// Scan the table asynchronously.
    ReadBack,
    /// Report the scanned rows.
    PrintRows,
    /// Drop the keyspace.
    Teardown,
}

impl Step {
    /// All steps in execution order.
    pub const ALL: [Step; 10] = [
        Step::Connect,
        Step::CleanupStale,
        Step::CreateKeyspace,
        Step::UseKeyspace,
        Step::CreateTable,
        Step::BuildStatements,
        Step::InsertRows,
        Step::ReadBack,
        Step::PrintRows,
        Step::Teardown,
    ];

    fn failed<E>(self) -> impl FnOnce(E) -> WorkflowError<E>
    where
        E: std::error::Error + 'static,
    {
        move |source| WorkflowError { step: self, source }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Connect => "connect",
            Step::CleanupStale => "stale keyspace cleanup",
            Step::CreateKeyspace => "create keyspace",
            Step::UseKeyspace => "use keyspace",
            Step::CreateTable => "create table",
            Step::BuildStatements => "build statements",
            Step::InsertRows => "insert rows",
            Step::ReadBack => "read back",
            Step::PrintRows => "print rows",
            Step::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

/// A step failed and the run was aborted.
#[derive(Error, Debug)]
#[error("Workflow step '{step}' failed: {source}")]
pub struct WorkflowError<E>
where
    E: std::error::Error + 'static,
{
    /// Step that failed.
    pub step: Step,
    /// Error reported by the session.
    #[source]
    pub source: E,
}

/// Insert statements built once and reused for every seed row.
pub struct InsertStatements<P> {
    /// Unprepared insert, carries its own consistency.
    pub simple: Statement,
    /// Prepared insert.
    pub prepared: P,
}

// Statement has no Debug impl
impl<P: fmt::Debug> fmt::Debug for InsertStatements<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertStatements")
            .field("simple", &self.simple.contents)
            .field("prepared", &self.prepared)
            .finish()
    }
}

/// Outcome of the asynchronous scan.
///
/// A failed scan doesn't abort the run, it is reported and the
/// workflow continues with no rows.
#[derive(Debug)]
pub enum ReadOutcome<E> {
    /// The scan succeeded.
    Rows(Vec<Row>),
    /// The scan failed.
    Failed(E),
}

impl<E> ReadOutcome<E> {
    /// Rows read, empty if the scan failed.
    pub fn rows(&self) -> &[Row] {
        match self {
            ReadOutcome::Rows(rows) => rows,
            ReadOutcome::Failed(_) => &[],
        }
    }

    /// The error of a failed scan.
    pub fn error(&self) -> Option<&E> {
        match self {
            ReadOutcome::Rows(_) => None,
            ReadOutcome::Failed(err) => Some(err),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport<E> {
    /// Whether a keyspace left by an earlier run had to be dropped first.
    pub dropped_stale: bool,
    /// Rows inserted, in insertion order.
    pub inserted: Vec<SeedRow>,
    /// Outcome of the scan.
    pub read: ReadOutcome<E>,
    /// Number of data lines written to the sink.
    pub printed: usize,
    /// Steps performed, in order.
    pub completed: Vec<Step>,
}

/// Runs the demo steps against a connected session.
pub struct Workflow<'s, S, K> {
    session: &'s S,
    config: WorkflowConfig,
    sink: K,
    completed: Vec<Step>,
}

impl<'s, S, K> Workflow<'s, S, K>
where
    S: CqlSession,
    K: ReportSink,
{
    /// Creates a workflow over an already connected session.
    ///
    /// `config` is expected to have passed [`WorkflowConfig::validate`].
    pub fn new(session: &'s S, config: WorkflowConfig, sink: K) -> Self {
        Self {
            session,
            config,
            sink,
            completed: vec![Step::Connect],
        }
    }

    /// Configuration of this run.
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Steps finished so far, in order.
    pub fn completed(&self) -> &[Step] {
        &self.completed
    }

    /// Gives back the sink.
    pub fn into_sink(self) -> K {
        self.sink
    }

    fn finish(&mut self, step: Step) {
        debug!("Step '{}' done", step);
        self.completed.push(step);
    }

    async fn execute_ddl(&self, step: Step, cql: String) -> Result<(), WorkflowError<S::Error>> {
        self.session
            .execute(&Statement::new(cql), Vec::new())
            .await
            .map_err(step.failed())?;
        Ok(())
    }

    /// Drops the keyspace if an earlier run left it behind.
    ///
    /// Returns whether it existed.
    pub async fn cleanup_stale(&mut self) -> Result<bool, WorkflowError<S::Error>> {
        let step = Step::CleanupStale;
        // The server folds unquoted identifiers to lower case
        let keyspace = self.config.keyspace.to_lowercase();
        let keyspaces = self
            .session
            .execute(&Statement::new(schema::LIST_KEYSPACES), Vec::new())
            .await
            .map_err(step.failed())?;

        let exists = keyspaces.iter().any(|row| {
            row.columns
                .first()
                .and_then(Option::as_ref)
                .and_then(CqlValue::as_text)
                .is_some_and(|name| *name == keyspace)
        });

        if exists {
            info!("Dropping existing keyspace {} ...", self.config.keyspace);
            self.execute_ddl(step, schema::drop_keyspace(&self.config))
                .await?;
        }

        self.finish(step);
        Ok(exists)
    }

    /// Creates the keyspace.
    pub async fn create_keyspace(&mut self) -> Result<(), WorkflowError<S::Error>> {
        info!("Creating keyspace {} ...", self.config.keyspace);
        self.execute_ddl(Step::CreateKeyspace, schema::create_keyspace(&self.config))
            .await?;
        self.finish(Step::CreateKeyspace);
        Ok(())
    }

    /// Makes the keyspace the default for unqualified statements.
    pub async fn use_keyspace(&mut self) -> Result<(), WorkflowError<S::Error>> {
        info!("Using keyspace {}", self.config.keyspace);
        self.session
            .use_keyspace(&self.config.keyspace)
            .await
            .map_err(Step::UseKeyspace.failed())?;
        self.finish(Step::UseKeyspace);
        Ok(())
    }

    /// Creates the table inside the current keyspace.
    pub async fn create_table(&mut self) -> Result<(), WorkflowError<S::Error>> {
        info!("Creating table {} ...", self.config.table);
        self.execute_ddl(Step::CreateTable, schema::create_table(&self.config))
            .await?;
        self.finish(Step::CreateTable);
        Ok(())
    }

    /// Builds the ad-hoc insert, with the configured consistency, and prepares
    /// the same insert on the session.
    pub async fn build_statements(
        &mut self,
    ) -> Result<InsertStatements<S::Prepared>, WorkflowError<S::Error>> {
        let cql = schema::insert_row(&self.config);

        let mut simple = Statement::new(cql.as_str());
        simple.set_consistency(self.config.insert_consistency);

        let prepared = self
            .session
            .prepare(&cql)
            .await
            .map_err(Step::BuildStatements.failed())?;

        self.finish(Step::BuildStatements);
        Ok(InsertStatements { simple, prepared })
    }

    /// Inserts the seed rows derived from `now`, one blocking request each.
    ///
    /// Rows inserted before a failing one stay in the table.
    pub async fn insert_rows(
        &mut self,
        statements: &InsertStatements<S::Prepared>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeedRow>, WorkflowError<S::Error>> {
        info!("Original time: {}", now);

        let mut inserted = Vec::with_capacity(4);
        for row in seed_rows(now) {
            let result = match row.style {
                InsertStyle::Simple => {
                    self.session
                        .execute(&statements.simple, row.values())
                        .await
                }
                InsertStyle::Prepared => {
                    self.session
                        .execute_prepared(&statements.prepared, row.values())
                        .await
                }
            };
            result.map_err(Step::InsertRows.failed())?;

            debug!("Inserted {} ({:?}, {})", row.key, row.style, row.column2);
            inserted.push(row);
        }

        self.finish(Step::InsertRows);
        Ok(inserted)
    }

    /// Scans the table without waiting, then waits for the result.
    ///
    /// A failure is logged and returned as [`ReadOutcome::Failed`].
    pub async fn read_back(&mut self) -> ReadOutcome<S::Error> {
        let session = self.session;
        let pending = session.execute_async(Statement::new(schema::select_all(&self.config)));

        let outcome = match pending.await {
            Ok(rows) => ReadOutcome::Rows(rows),
            Err(err) => {
                error!("Reading rows back failed: {}", err);
                ReadOutcome::Failed(err)
            }
        };

        self.finish(Step::ReadBack);
        outcome
    }

    /// Writes the header and one line per scanned row to the sink.
    ///
    /// Returns the number of row lines written.
    pub fn print_rows(&mut self, outcome: &ReadOutcome<S::Error>) -> usize {
        self.sink.line(HEADER);
        self.sink.line(SEPARATOR);

        let rows = outcome.rows();
        for row in rows {
            self.sink.line(&render_row(row));
        }

        self.finish(Step::PrintRows);
        rows.len()
    }

    /// Drops the keyspace.
    pub async fn teardown(&mut self) -> Result<(), WorkflowError<S::Error>> {
        info!("Dropping keyspace {} ...", self.config.keyspace);
        self.execute_ddl(Step::Teardown, schema::drop_keyspace(&self.config))
            .await?;
        self.finish(Step::Teardown);
        Ok(())
    }

    async fn populate(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeedRow>, WorkflowError<S::Error>> {
        self.use_keyspace().await?;
        self.create_table().await?;
        let statements = self.build_statements().await?;
        self.insert_rows(&statements, now).await
    }

    /// Performs every step in order.
    ///
    /// The keyspace is dropped at the end even if the scan failed. If a step
    /// after keyspace creation fails, the keyspace is dropped on a best-effort
    /// basis before the error is returned.
    pub async fn run(mut self) -> Result<RunReport<S::Error>, WorkflowError<S::Error>> {
        let dropped_stale = self.cleanup_stale().await?;
        self.create_keyspace().await?;

        let inserted = match self.populate(Utc::now()).await {
            Ok(inserted) => inserted,
            Err(err) => {
                if let Err(teardown_err) = self.teardown().await {
                    warn!("Cleanup after failed step also failed: {}", teardown_err);
                }
                return Err(err);
            }
        };

        let read = self.read_back().await;
        let printed = self.print_rows(&read);

        self.teardown().await?;

        Ok(RunReport {
            dropped_stale,
            inserted,
            read,
            printed,
            completed: self.completed,
        })
    }
}

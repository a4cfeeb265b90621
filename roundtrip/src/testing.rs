use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use scylla::statement::{Consistency, Statement};
use scylla::value::{CqlTimestamp, CqlValue, Row};
use thiserror::Error;

use crate::schema;
use crate::session::{CqlSession, RowsFuture};

pub(crate) fn setup_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(tracing_subscriber::fmt::TestWriter::new())
        .try_init();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Mock failure: {0}")]
pub(crate) struct MockError(pub(crate) String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockPrepared {
    pub(crate) cql: String,
}

/// A request seen by [`MockSession`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Executed {
    pub(crate) cql: String,
    pub(crate) prepared: bool,
    pub(crate) consistency: Option<Consistency>,
    pub(crate) values: Vec<CqlValue>,
}

type TableRows = BTreeMap<(String, String), CqlTimestamp>;

#[derive(Default)]
struct MockState {
    // keyspace -> table -> rows
    keyspaces: BTreeMap<String, BTreeMap<String, TableRows>>,
    current_keyspace: Option<String>,
    executed: Vec<Executed>,
    failing_prefixes: Vec<String>,
    fail_async_reads: bool,
    fail_prepared_executions: bool,
}

/// In-memory session understanding exactly the statements the workflow issues.
pub(crate) struct MockSession {
    state: Mutex<MockState>,
}

impl MockSession {
    pub(crate) fn new() -> Self {
        let session = Self {
            state: Mutex::new(MockState::default()),
        };
        session.add_keyspace("system");
        session.add_keyspace("system_schema");
        session
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn add_keyspace(&self, name: &str) {
        self.state()
            .keyspaces
            .insert(name.to_owned(), BTreeMap::new());
    }

    pub(crate) fn has_keyspace(&self, name: &str) -> bool {
        self.state().keyspaces.contains_key(name)
    }

    pub(crate) fn current_keyspace(&self) -> Option<String> {
        self.state().current_keyspace.clone()
    }

    pub(crate) fn row_count(&self, keyspace: &str, table: &str) -> Option<usize> {
        self.state()
            .keyspaces
            .get(keyspace)?
            .get(table)
            .map(BTreeMap::len)
    }

    pub(crate) fn executed(&self) -> Vec<Executed> {
        self.state().executed.clone()
    }

    pub(crate) fn executed_cql(&self) -> Vec<String> {
        self.state()
            .executed
            .iter()
            .map(|e| e.cql.clone())
            .collect()
    }

    pub(crate) fn fail_statements_starting_with(&self, prefix: &str) {
        self.state().failing_prefixes.push(prefix.to_owned());
    }

    pub(crate) fn fail_async_reads(&self) {
        self.state().fail_async_reads = true;
    }

    pub(crate) fn fail_prepared_executions(&self) {
        self.state().fail_prepared_executions = true;
    }

    fn handle(&self, request: Executed) -> Result<Vec<Row>, MockError> {
        let mut state = self.state();
        state.executed.push(request.clone());

        if let Some(prefix) = state
            .failing_prefixes
            .iter()
            .find(|p| request.cql.starts_with(p.as_str()))
        {
            return Err(MockError(prefix.clone()));
        }
        if request.prepared && state.fail_prepared_executions {
            return Err(MockError("prepared execution".to_owned()));
        }

        state.apply(&request.cql, request.values)
    }
}

impl MockState {
    fn apply(&mut self, cql: &str, values: Vec<CqlValue>) -> Result<Vec<Row>, MockError> {
        if cql == schema::LIST_KEYSPACES {
            return Ok(self
                .keyspaces
                .keys()
                .map(|name| Row {
                    columns: vec![Some(CqlValue::Text(name.clone()))],
                })
                .collect());
        }

        // Unquoted identifiers are folded to lower case, as on a real cluster
        let folded = cql.to_lowercase();
        let mut words = folded.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("create"), Some("keyspace"), Some(name)) => {
                if self.keyspaces.contains_key(name) {
                    return Err(MockError(format!("keyspace {name} already exists")));
                }
                self.keyspaces.insert(name.to_owned(), BTreeMap::new());
            }
            (Some("drop"), Some("keyspace"), Some(name)) => {
                if self.keyspaces.remove(name).is_none() {
                    return Err(MockError(format!("keyspace {name} doesn't exist")));
                }
            }
            (Some("create"), Some("table"), Some(name)) => {
                let tables = self.current_tables()?;
                if tables.contains_key(name) {
                    return Err(MockError(format!("table {name} already exists")));
                }
                tables.insert(name.to_owned(), TableRows::new());
            }
            (Some("insert"), Some("into"), Some(name)) => {
                let rows = self.current_table(name)?;
                match values.as_slice() {
                    [CqlValue::Text(key), CqlValue::Text(column1), CqlValue::Timestamp(ts)] => {
                        rows.insert((key.clone(), column1.clone()), *ts);
                    }
                    _ => return Err(MockError(format!("unexpected values {values:?}"))),
                }
            }
            (Some("select"), Some("*"), Some("from")) => {
                let name = words.next().unwrap_or_default();
                let rows = self.current_table(name)?;
                return Ok(rows
                    .iter()
                    .map(|((key, column1), ts)| Row {
                        columns: vec![
                            Some(CqlValue::Text(key.clone())),
                            Some(CqlValue::Text(column1.clone())),
                            Some(CqlValue::Timestamp(*ts)),
                        ],
                    })
                    .collect());
            }
            _ => return Err(MockError(format!("unsupported statement: {cql}"))),
        }

        Ok(Vec::new())
    }

    fn current_tables(&mut self) -> Result<&mut BTreeMap<String, TableRows>, MockError> {
        let keyspace = self
            .current_keyspace
            .as_ref()
            .ok_or_else(|| MockError("no keyspace in use".to_owned()))?;
        self.keyspaces
            .get_mut(keyspace)
            .ok_or_else(|| MockError(format!("keyspace {keyspace} doesn't exist")))
    }

    fn current_table(&mut self, name: &str) -> Result<&mut TableRows, MockError> {
        self.current_tables()?
            .get_mut(name)
            .ok_or_else(|| MockError(format!("table {name} doesn't exist")))
    }
}

#[async_trait]
impl CqlSession for MockSession {
    type Prepared = MockPrepared;
    type Error = MockError;

    async fn execute(
        &self,
        statement: &Statement,
        values: Vec<CqlValue>,
    ) -> Result<Vec<Row>, Self::Error> {
        self.handle(Executed {
            cql: statement.contents.clone(),
            prepared: false,
            consistency: statement.get_consistency(),
            values,
        })
    }

    async fn execute_prepared(
        &self,
        prepared: &Self::Prepared,
        values: Vec<CqlValue>,
    ) -> Result<Vec<Row>, Self::Error> {
        self.handle(Executed {
            cql: prepared.cql.clone(),
            prepared: true,
            consistency: None,
            values,
        })
    }

    fn execute_async(&self, statement: Statement) -> RowsFuture<'_, Self::Error> {
        Box::pin(async move {
            if self.state().fail_async_reads {
                return Err(MockError("read timed out".to_owned()));
            }
            let consistency = statement.get_consistency();
            self.handle(Executed {
                cql: statement.contents,
                prepared: false,
                consistency,
                values: Vec::new(),
            })
        })
    }

    async fn prepare(&self, cql: &str) -> Result<Self::Prepared, Self::Error> {
        Ok(MockPrepared {
            cql: cql.to_owned(),
        })
    }

    async fn use_keyspace(&self, keyspace: &str) -> Result<(), Self::Error> {
        let keyspace = keyspace.to_lowercase();
        let mut state = self.state();
        if !state.keyspaces.contains_key(&keyspace) {
            return Err(MockError(format!("keyspace {keyspace} doesn't exist")));
        }
        state.current_keyspace = Some(keyspace);
        Ok(())
    }
}

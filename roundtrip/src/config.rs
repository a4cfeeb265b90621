//! Configuration of a single workflow run.

use std::time::Duration;

use scylla::statement::Consistency;
use thiserror::Error;

/// Address of the node the demo connects to when nothing else is configured.
pub const DEFAULT_KNOWN_NODE: &str = "127.0.0.1:9042";

/// Name of the throwaway keyspace.
pub const DEFAULT_KEYSPACE: &str = "testkeyspace";

/// Name of the table created inside the keyspace.
pub const DEFAULT_TABLE: &str = "mytable";

/// Replication factor used by `SimpleStrategy`.
///
/// Good enough for a single node or a small demo cluster,
/// not a durability guarantee.
pub const DEFAULT_REPLICATION_FACTOR: u32 = 2;

const MAX_IDENTIFIER_LEN: usize = 48;

/// Everything a run needs to know about the cluster and the schema it provisions.
///
/// The default value describes the fixed demo contract. Setters follow
/// the builder style of `SessionBuilder`:
///
/// ```
/// # use scylla_roundtrip::WorkflowConfig;
/// let config = WorkflowConfig::default()
///     .with_known_nodes(["127.0.0.2:9042"])
///     .with_keyspace("other_keyspace");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// Seed addresses handed to the session builder.
    pub known_nodes: Vec<String>,
    /// Keyspace created at start and dropped at the end of the run.
    pub keyspace: String,
    /// Table created inside `keyspace`.
    pub table: String,
    /// `replication_factor` of the `SimpleStrategy` keyspace.
    pub replication_factor: u32,
    /// Consistency required from the ad-hoc insert statement.
    pub insert_consistency: Consistency,
    /// Timeout for establishing connections to the seed nodes.
    pub connection_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            known_nodes: vec![DEFAULT_KNOWN_NODE.to_owned()],
            keyspace: DEFAULT_KEYSPACE.to_owned(),
            table: DEFAULT_TABLE.to_owned(),
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            insert_consistency: Consistency::One,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl WorkflowConfig {
    /// Replaces the seed addresses.
    pub fn with_known_nodes(
        mut self,
        nodes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.known_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the keyspace name.
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    /// Sets the table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Sets the replication factor of the keyspace.
    pub fn with_replication_factor(mut self, replication_factor: u32) -> Self {
        self.replication_factor = replication_factor;
        self
    }

    /// Sets the consistency of the ad-hoc insert statement.
    pub fn with_insert_consistency(mut self, consistency: Consistency) -> Self {
        self.insert_consistency = consistency;
        self
    }

    /// Sets the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Checks that the configuration can be turned into valid CQL.
    ///
    /// Keyspace and table names end up interpolated into DDL statements,
    /// so they are restricted to what CQL accepts unquoted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.known_nodes.is_empty() {
            return Err(ConfigError::NoKnownNodes);
        }
        verify_identifier(&self.keyspace)?;
        verify_identifier(&self.table)?;
        if self.replication_factor == 0 {
            return Err(ConfigError::ZeroReplicationFactor);
        }
        Ok(())
    }
}

/// Invalid [`WorkflowConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// No seed address was given.
    #[error("At least one known node is required")]
    NoKnownNodes,

    /// Identifier is an empty string.
    #[error("Identifier name can't be empty")]
    EmptyIdentifier,

    /// Identifier is longer than CQL allows.
    #[error("Identifier name too long, must be up to 48 characters, found {1} characters. Bad name: {0}")]
    IdentifierTooLong(String, usize),

    /// Identifier contains a character that would need quoting.
    #[error("Illegal character found: '{1}', only alphanumeric and underscores allowed. Bad name: {0}")]
    IllegalCharacter(String, char),

    /// A keyspace with no replicas can't hold data.
    #[error("Replication factor must be at least 1")]
    ZeroReplicationFactor,
}

// "Keyspace names can have up to 48 alphanumeric characters and contain underscores;
// only letters and numbers are supported as the first character."
// Cassandra accepts an underscore as the first character as well, so we do too.
fn verify_identifier(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyIdentifier);
    }

    // Only ascii passes the loop below, so chars().count() == len() for valid names
    let len = name.chars().count();
    if len > MAX_IDENTIFIER_LEN {
        return Err(ConfigError::IdentifierTooLong(name.to_owned(), len));
    }

    for character in name.chars() {
        match character {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => {}
            _ => return Err(ConfigError::IllegalCharacter(name.to_owned(), character)),
        }
    }

    Ok(())
}

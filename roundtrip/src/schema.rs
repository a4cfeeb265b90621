//! CQL text of every statement the workflow issues.
//!
//! Identifiers are interpolated directly, so callers pass names that went
//! through [`WorkflowConfig::validate`](crate::WorkflowConfig::validate).

use crate::config::WorkflowConfig;

/// Lists all keyspaces known to the cluster, one name per row.
pub const LIST_KEYSPACES: &str = "SELECT keyspace_name FROM system_schema.keyspaces";

/// `CREATE KEYSPACE` with `SimpleStrategy` replication.
pub fn create_keyspace(config: &WorkflowConfig) -> String {
    format!(
        "CREATE KEYSPACE {} WITH REPLICATION = {{'class' : 'SimpleStrategy', 'replication_factor' : {}}}",
        config.keyspace, config.replication_factor
    )
}

/// `DROP KEYSPACE` of the configured keyspace.
pub fn drop_keyspace(config: &WorkflowConfig) -> String {
    format!("DROP KEYSPACE {}", config.keyspace)
}

/// Table with a text partition key, a text clustering column and a timestamp.
///
/// Unqualified, relies on the session keyspace.
pub fn create_table(config: &WorkflowConfig) -> String {
    format!(
        "CREATE TABLE {} (primkey text, column1 text, column2 timestamp, PRIMARY KEY (primkey, column1))",
        config.table
    )
}

/// Insert with three positional bind markers, shared by the ad-hoc and the prepared form.
pub fn insert_row(config: &WorkflowConfig) -> String {
    format!(
        "INSERT INTO {} (primkey, column1, column2) VALUES (?, ?, ?)",
        config.table
    )
}

/// Full scan of the table.
pub fn select_all(config: &WorkflowConfig) -> String {
    format!("SELECT * FROM {}", config.table)
}

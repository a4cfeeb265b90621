//! Round-trips a few rows through a throwaway keyspace on a ScyllaDB or
//! Cassandra cluster.
//!
//! A run drops any keyspace left behind by an earlier run, creates a fresh
//! keyspace and table, inserts four rows with ad-hoc and prepared statements
//! (timestamps given both as raw epoch milliseconds and as
//! `chrono::DateTime<Utc>`), scans the table asynchronously, reports the rows
//! and drops the keyspace again.
//!
//! # Example
//!
//! ```rust,no_run
//! use scylla_roundtrip::{run_demo, TracingSink, WorkflowConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let report = run_demo(WorkflowConfig::default(), TracingSink).await?;
//! println!("printed {} rows", report.printed);
//! # Ok(())
//! # }
//! ```
//!
//! The steps can also be driven one at a time through [`Workflow`], against
//! any [`CqlSession`].

pub mod config;
pub mod rows;
pub mod schema;
pub mod session;
pub mod sink;
pub mod workflow;

mod demo;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, WorkflowConfig};
pub use demo::{run_demo, RunError};
pub use rows::{seed_rows, InsertStyle, SeedRow, TimeValue};
pub use session::{connect, CqlSession, ScyllaSessionError};
pub use sink::{ReportSink, TracingSink};
pub use workflow::{InsertStatements, ReadOutcome, RunReport, Step, Workflow, WorkflowError};

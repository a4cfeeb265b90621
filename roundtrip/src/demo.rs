use scylla::errors::NewSessionError;
use thiserror::Error;

use crate::config::{ConfigError, WorkflowConfig};
use crate::session::{self, ScyllaSessionError};
use crate::sink::ReportSink;
use crate::workflow::{RunReport, Workflow, WorkflowError};

/// Error of a complete demo run against a cluster.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RunError {
    /// The configuration was rejected before connecting.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No session could be established.
    #[error("Failed to connect to the cluster: {0}")]
    Connect(#[from] NewSessionError),

    /// A workflow step failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError<ScyllaSessionError>),
}

/// Connects to the configured nodes and runs the whole workflow once,
/// writing the scanned rows to `sink`.
pub async fn run_demo<K>(
    config: WorkflowConfig,
    sink: K,
) -> Result<RunReport<ScyllaSessionError>, RunError>
where
    K: ReportSink,
{
    config.validate()?;
    let session = session::connect(&config).await?;

    let report = Workflow::new(&session, config, sink).run().await?;
    Ok(report)
}

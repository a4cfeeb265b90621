//! Runs the roundtrip demo once against a local node.

use anyhow::Result;
use scylla_roundtrip::{run_demo, TracingSink, WorkflowConfig};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .init();

    match run_demo(WorkflowConfig::default(), TracingSink).await {
        Ok(report) => {
            info!("Ok. {} rows read back", report.printed);
            Ok(())
        }
        Err(err) => {
            let err = anyhow::Error::from(err);
            error!("{:?}", err);
            Err(err)
        }
    }
}

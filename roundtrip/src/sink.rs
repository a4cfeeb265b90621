//! Where the workflow writes its report of scanned rows.

use tracing::info;

/// Receives report lines, one call per line.
pub trait ReportSink: Send {
    /// Writes a single line.
    fn line(&mut self, line: &str);
}

/// Emits every line as an `INFO` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn line(&mut self, line: &str) {
        info!("{}", line);
    }
}

/// Collects lines in memory.
impl ReportSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn line(&mut self, line: &str) {
        (**self).line(line);
    }
}

use std::io::Write;

use async_trait::async_trait;
use tracing::error;

use s3vpurge_rs::{DeletionResult, ResultHandler};

/// Writes one line per result, in arrival order.
pub struct ResultPrinter<W: Write + Send> {
    writer: W,
    failed_results: u64,
}

impl<W: Write + Send> ResultPrinter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed_results: 0,
        }
    }

    /// Number of `Unable to delete` lines written so far.
    pub fn failed_results(&self) -> u64 {
        self.failed_results
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> ResultHandler for ResultPrinter<W> {
    async fn handle(&mut self, result: DeletionResult) {
        if result.is_failed() {
            self.failed_results += 1;
        }

        if let Err(e) = writeln!(self.writer, "{result}") {
            error!(error = %e, "failed to write result line.");
        }
    }
}

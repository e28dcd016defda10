//! Deletion worker for the s3vpurge-rs pipeline.
//!
//! Each [`ObjectVersionDeleter`] pulls [`DeletionTask`]s from the shared task
//! channel and turns every task into exactly one [`DeletionResult`]. Per-item
//! failures become `DeletionResult::Failed` and never stop the worker.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::stage::{SendResult, Stage};
use crate::types::error::S3vpurgeError;
use crate::types::{DeletionResult, DeletionStatsReport, DeletionTask};

/// Pipeline worker that deletes one object version per received task.
pub struct ObjectVersionDeleter {
    worker_index: u16,
    base: Stage<DeletionResult>,
    deletion_stats_report: Arc<DeletionStatsReport>,
}

impl ObjectVersionDeleter {
    pub fn new(
        base: Stage<DeletionResult>,
        worker_index: u16,
        deletion_stats_report: Arc<DeletionStatsReport>,
    ) -> Self {
        Self {
            worker_index,
            base,
            deletion_stats_report,
        }
    }

    /// Main entry point: receive tasks until the task channel is closed and
    /// drained, forwarding one result per task.
    ///
    /// Returns early without error if the result channel has been closed.
    pub async fn delete(&self) -> Result<()> {
        debug!(worker_index = self.worker_index, "delete worker started.");

        let receiver = self
            .base
            .receiver
            .as_ref()
            .context("delete worker has no task channel.")?;

        while let Ok(task) = receiver.recv().await {
            let result = self.process_task(task).await;
            self.deletion_stats_report.record(&result);

            if self.base.send(result).await? == SendResult::Closed {
                debug!(
                    worker_index = self.worker_index,
                    "result channel closed. delete worker has been stopped."
                );
                return Ok(());
            }
        }

        debug!(
            worker_index = self.worker_index,
            "delete worker has been completed."
        );
        Ok(())
    }

    async fn process_task(&self, task: DeletionTask) -> DeletionResult {
        if self.base.config.dry_run {
            debug!(
                worker_index = self.worker_index,
                key = task.key(),
                version_id = task.version_id(),
                "[dry-run] object version would be deleted."
            );
            return DeletionResult::DryRun(task);
        }

        match self
            .base
            .target
            .delete_object_version(task.key(), task.version_id())
            .await
        {
            Ok(()) => {
                debug!(
                    worker_index = self.worker_index,
                    key = task.key(),
                    version_id = task.version_id(),
                    "object version deleted."
                );
                DeletionResult::Deleted(task)
            }
            Err(e) => {
                let error = error_detail(&e);
                warn!(
                    worker_index = self.worker_index,
                    key = task.key(),
                    version_id = task.version_id(),
                    error = error,
                    "failed to delete object version."
                );
                DeletionResult::Failed { task, error }
            }
        }
    }
}

/// Human-readable error detail for a failed deletion.
///
/// Per-key errors reported by DeleteObjects carry their `code: message` text
/// directly; anything else is rendered with its full context chain.
fn error_detail(e: &anyhow::Error) -> String {
    match e.downcast_ref::<S3vpurgeError>() {
        Some(S3vpurgeError::Deletion(detail)) => detail.clone(),
        _ => format!("{e:#}"),
    }
}

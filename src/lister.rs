use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::stage::{SendResult, Stage};
use crate::storage::ListingMarker;
use crate::types::error::S3vpurgeError;
use crate::types::{DeletionStatsReport, DeletionTask};

/// Lists every object version and delete marker for the deletion pipeline.
///
/// The lister is the first stage in the pipeline:
///
/// ```text
/// VersionLister → ObjectVersionDeleter × N → ResultSink
/// ```
///
/// It has no `receiver` channel (it's the entry point) and is the only owner
/// of the task sender. Once it is dropped the task channel closes and workers
/// drain what is left.
pub struct VersionLister {
    stage: Stage<DeletionTask>,
    deletion_stats_report: Arc<DeletionStatsReport>,
}

impl VersionLister {
    pub fn new(
        stage: Stage<DeletionTask>,
        deletion_stats_report: Arc<DeletionStatsReport>,
    ) -> Self {
        Self {
            stage,
            deletion_stats_report,
        }
    }

    /// Page through ListObjectVersions and send one task per entry.
    ///
    /// Each page sends its live versions first, then its delete markers.
    /// A failed page fetch stops the listing; the error carries
    /// [`S3vpurgeError::Enumeration`] as context. Tasks sent before the
    /// failure stay in the channel and are still processed.
    pub async fn list_target(&self) -> Result<()> {
        debug!("list target object versions has started.");

        let prefix = self.stage.config.prefix.as_deref();
        let max_keys = self.stage.config.max_keys;
        let mut marker = ListingMarker::default();
        let mut page_count: u64 = 0;

        loop {
            let page = self
                .stage
                .target
                .list_object_versions_page(prefix, &marker, max_keys)
                .await
                .with_context(|| {
                    S3vpurgeError::Enumeration(format!(
                        "listing object versions failed for {}",
                        self.stage.config.target_display()
                    ))
                })?;
            page_count += 1;

            debug!(
                page = page_count,
                entries = page.entry_count(),
                versions = page.versions.len(),
                delete_markers = page.delete_markers.len(),
                "object version page received."
            );

            for task in page.versions.into_iter().chain(page.delete_markers) {
                if self.stage.send(task).await? == SendResult::Closed {
                    debug!("task channel closed. list target object versions has been stopped.");
                    return Ok(());
                }
                self.deletion_stats_report.increment_listed();
            }

            match page.next_marker {
                Some(next_marker) => marker = next_marker,
                None => break,
            }
        }

        debug!(
            pages = page_count,
            "list target object versions has been completed."
        );
        Ok(())
    }
}

//! Shared integration test infrastructure for s3vpurge-rs.
//!
//! `FakeStorage` serves paged listings from memory and records deletions so
//! the full pipeline can run without AWS. With `--cfg e2e_test`, the `s3`
//! module adds `TestHelper` for runs against real S3.

#![allow(dead_code)]

#[cfg(e2e_test)]
pub mod s3;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use s3vpurge_rs::{
    Config, DeletionPipeline, DeletionResult, DeletionStats, DeletionTask, ListingMarker,
    S3vpurgeError, StorageTrait, VersionPage,
};

/// One listed entry: key, version id, and whether it is a delete marker.
pub type Entry = (&'static str, &'static str, bool);

/// In-memory bucket served through `StorageTrait`.
///
/// Listing pages hold `page_size` entries each, filtered by prefix first.
/// The page index is carried in the key marker.
#[derive(Clone)]
pub struct FakeStorage {
    entries: Arc<Vec<(String, String, bool)>>,
    page_size: usize,
    failing_page: Option<usize>,
    failing_keys: Arc<HashSet<String>>,
    delete_delay: Option<Duration>,
    deleted: Arc<Mutex<Vec<(String, String)>>>,
    list_calls: Arc<Mutex<usize>>,
}

impl FakeStorage {
    pub fn new(entries: &[Entry], page_size: usize) -> Self {
        Self {
            entries: Arc::new(
                entries
                    .iter()
                    .map(|(key, version_id, marker)| {
                        (key.to_string(), version_id.to_string(), *marker)
                    })
                    .collect(),
            ),
            page_size: page_size.max(1),
            failing_page: None,
            failing_keys: Arc::new(HashSet::new()),
            delete_delay: None,
            deleted: Arc::new(Mutex::new(Vec::new())),
            list_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// `count` live versions named `obj-{i}` with version id `v{i}`.
    pub fn with_generated(count: usize, page_size: usize) -> Self {
        let mut storage = Self::new(&[], page_size);
        storage.entries = Arc::new(
            (0..count)
                .map(|i| (format!("obj-{i:04}"), format!("v{i}"), false))
                .collect(),
        );
        storage
    }

    /// Listing request number `page` (zero based) fails.
    pub fn fail_listing_at_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    /// Deleting any version of `key` is rejected with AccessDenied.
    pub fn deny_delete_of(mut self, key: &str) -> Self {
        let mut keys = (*self.failing_keys).clone();
        keys.insert(key.to_string());
        self.failing_keys = Arc::new(keys);
        self
    }

    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    /// Deleted (key, version id) pairs, sorted.
    pub fn deleted(&self) -> Vec<(String, String)> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort();
        deleted
    }

    pub fn list_call_count(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl StorageTrait for FakeStorage {
    fn bucket(&self) -> &str {
        "fake-bucket"
    }

    async fn list_object_versions_page(
        &self,
        prefix: Option<&str>,
        marker: &ListingMarker,
        max_keys: i32,
    ) -> Result<VersionPage> {
        assert!(max_keys >= 1);

        let page_index = match marker.key_marker.as_deref() {
            Some(index) => index.parse::<usize>()?,
            None => 0,
        };
        *self.list_calls.lock().unwrap() += 1;

        if self.failing_page == Some(page_index) {
            return Err(anyhow!("InternalError: We encountered an internal error."));
        }

        let matching: Vec<&(String, String, bool)> = self
            .entries
            .iter()
            .filter(|(key, _, _)| prefix.is_none_or(|prefix| key.starts_with(prefix)))
            .collect();

        let start = page_index * self.page_size;
        let end = (start + self.page_size).min(matching.len());
        let mut page = VersionPage::default();
        for (key, version_id, delete_marker) in matching.get(start..end).unwrap_or_default() {
            let task = DeletionTask::new(key.as_str(), version_id.as_str());
            if *delete_marker {
                page.delete_markers.push(task);
            } else {
                page.versions.push(task);
            }
        }
        if end < matching.len() {
            page.next_marker = Some(ListingMarker {
                key_marker: Some((page_index + 1).to_string()),
                version_id_marker: Some("marker".to_string()),
            });
        }

        Ok(page)
    }

    async fn delete_object_version(&self, key: &str, version_id: &str) -> Result<()> {
        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_keys.contains(key) {
            return Err(anyhow!(S3vpurgeError::Deletion(
                "AccessDenied: Access Denied".to_string()
            )));
        }

        self.deleted
            .lock()
            .unwrap()
            .push((key.to_string(), version_id.to_string()));
        Ok(())
    }
}

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    pub results: Vec<DeletionResult>,
    pub stats: DeletionStats,
    pub has_error: bool,
    pub has_panic: bool,
    pub errors: Vec<String>,
}

/// Config for `prefix` in the fake bucket, with no dry-run countdown.
pub fn make_config(prefix: Option<&str>, worker_size: u16, dry_run: bool) -> Config {
    let mut config = Config::for_target("fake-bucket", prefix);
    config.worker_size = worker_size;
    config.dry_run = dry_run;
    config.dry_run_delay_milliseconds = 0;
    config
}

pub async fn run_pipeline(config: Config, storage: FakeStorage) -> PipelineResult {
    let mut pipeline = DeletionPipeline::with_storage(config, Box::new(storage))
        .unwrap_or_else(|e| panic!("Failed to create pipeline: {e}"));

    let mut results: Vec<DeletionResult> = Vec::new();
    pipeline.run(&mut results).await;

    PipelineResult {
        results,
        stats: pipeline.get_deletion_stats(),
        has_error: pipeline.has_error(),
        has_panic: pipeline.has_panic(),
        errors: pipeline.get_error_messages().unwrap_or_default(),
    }
}

/// Rendered result lines, sorted so runs with several workers compare equal.
pub fn sorted_lines(results: &[DeletionResult]) -> Vec<String> {
    let mut lines: Vec<String> = results.iter().map(ToString::to_string).collect();
    lines.sort();
    lines
}

use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::config::Config;
use crate::types::DeletionTask;

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Position in a ListObjectVersions enumeration.
///
/// The default marker (both fields `None`) requests the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingMarker {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

/// One page of a ListObjectVersions enumeration.
///
/// `next_marker` is `Some` exactly when the provider reported more pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPage {
    pub versions: Vec<DeletionTask>,
    pub delete_markers: Vec<DeletionTask>,
    pub next_marker: Option<ListingMarker>,
}

impl VersionPage {
    pub fn entry_count(&self) -> usize {
        self.versions.len() + self.delete_markers.len()
    }
}

/// Storage operations needed by the purge pipeline.
///
/// - `list_object_versions_page`: one page of versions and delete markers
///   under a prefix. Listing failures are unrecoverable for the run.
/// - `delete_object_version`: remove exactly one version. Failures are
///   reported per item and never stop the pipeline.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Bucket this storage operates on.
    fn bucket(&self) -> &str;

    async fn list_object_versions_page(
        &self,
        prefix: Option<&str>,
        marker: &ListingMarker,
        max_keys: i32,
    ) -> Result<VersionPage>;

    async fn delete_object_version(&self, key: &str, version_id: &str) -> Result<()>;
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Create the S3 storage for the configured bucket.
///
/// Without a `target_client_config` the client is built from the default
/// AWS environment (profile, env vars, IMDS).
pub async fn create_storage(config: &Config) -> Storage {
    let client_config = config.target_client_config.clone().unwrap_or_default();

    s3::S3Storage::boxed(config.bucket.clone(), &client_config).await
}

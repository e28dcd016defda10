//! Real S3 helpers for E2E tests.
//!
//! All helpers use the `s3vpurge-e2e-test` AWS profile. Each test creates its
//! own versioned bucket and removes it through `BucketGuard`.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration, Delete,
    ObjectIdentifier, VersioningConfiguration,
};
use s3vpurge_rs::config::args::build_config_from_args;
use s3vpurge_rs::{Config, DeletionPipeline, DeletionResult};
use uuid::Uuid;

use super::PipelineResult;

/// AWS profile used for all E2E tests.
pub const AWS_PROFILE: &str = "s3vpurge-e2e-test";

const DEFAULT_REGION: &str = "us-east-1";

/// Default timeout for one E2E test.
pub const E2E_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Wraps an async E2E test body with [`E2E_TIMEOUT`].
#[macro_export]
macro_rules! e2e_timeout {
    ($body:expr) => {
        tokio::time::timeout(common::s3::E2E_TIMEOUT, $body)
            .await
            .expect("E2E test timed out")
    };
}

/// Deletes every version and the bucket itself when dropped, even on panic.
pub struct BucketGuard {
    helper: Arc<TestHelper>,
    bucket: String,
}

impl Drop for BucketGuard {
    fn drop(&mut self) {
        let helper = self.helper.clone();
        let bucket = self.bucket.clone();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tokio::task::block_in_place(|| {
                tokio::runtime::Handle::current().block_on(async move {
                    helper.delete_bucket_cascade(&bucket).await;
                });
            });
        }));
    }
}

pub struct TestHelper {
    client: Client,
    region: String,
}

impl TestHelper {
    pub async fn new() -> Arc<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(AWS_PROFILE)
            .load()
            .await;

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Arc::new(Self {
            client: Client::new(&sdk_config),
            region,
        })
    }

    pub fn bucket_guard(self: &Arc<Self>, bucket: &str) -> BucketGuard {
        BucketGuard {
            helper: Arc::clone(self),
            bucket: bucket.to_string(),
        }
    }

    pub fn generate_bucket_name(&self) -> String {
        format!("s3vpurge-e2e-{}", Uuid::new_v4())
    }

    pub async fn create_versioned_bucket(&self, bucket: &str) {
        let mut builder = self.client.create_bucket().bucket(bucket);

        // us-east-1 must NOT specify a location constraint
        if self.region != "us-east-1" {
            let config = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            builder = builder.create_bucket_configuration(config);
        }

        builder
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to create bucket {bucket}: {e}"));

        let versioning_config = VersioningConfiguration::builder()
            .status(BucketVersioningStatus::Enabled)
            .build();

        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(versioning_config)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to enable versioning on {bucket}: {e}"));
    }

    pub async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to put object {key} in {bucket}: {e}"));
    }

    /// Plain DeleteObject without a version id, which leaves a delete marker.
    pub async fn delete_object(&self, bucket: &str, key: &str) {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .unwrap_or_else(|e| panic!("Failed to delete object {key} in {bucket}: {e}"));
    }

    /// (key, version id) pairs for every version and delete marker.
    /// Delete marker keys carry a "[delete-marker]" prefix.
    pub async fn list_object_versions(&self, bucket: &str) -> Vec<(String, String)> {
        let mut result = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_id_marker.take())
                .send()
                .await
                .unwrap_or_else(|e| panic!("Failed to list object versions in {bucket}: {e}"));

            for v in resp.versions() {
                if let (Some(key), Some(vid)) = (v.key(), v.version_id()) {
                    result.push((key.to_string(), vid.to_string()));
                }
            }
            for m in resp.delete_markers() {
                if let (Some(key), Some(vid)) = (m.key(), m.version_id()) {
                    result.push((format!("[delete-marker]{key}"), vid.to_string()));
                }
            }

            if resp.is_truncated() != Some(true) {
                break;
            }
            key_marker = resp.next_key_marker().map(str::to_string);
            version_id_marker = resp.next_version_id_marker().map(str::to_string);
        }

        result
    }

    pub async fn delete_bucket_cascade(&self, bucket: &str) {
        let mut remaining = self.list_version_identifiers(bucket).await;
        while !remaining.is_empty() {
            for chunk in remaining.chunks(1000) {
                let Ok(delete) = Delete::builder()
                    .set_objects(Some(chunk.to_vec()))
                    .quiet(true)
                    .build()
                else {
                    return;
                };
                let _ = self
                    .client
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete)
                    .send()
                    .await;
            }
            remaining = self.list_version_identifiers(bucket).await;
        }

        let _ = self.client.delete_bucket().bucket(bucket).send().await;
    }

    async fn list_version_identifiers(&self, bucket: &str) -> Vec<ObjectIdentifier> {
        let Ok(resp) = self.client.list_object_versions().bucket(bucket).send().await else {
            return Vec::new();
        };

        let versions = resp
            .versions()
            .iter()
            .map(|v| (v.key(), v.version_id()));
        let markers = resp
            .delete_markers()
            .iter()
            .map(|m| (m.key(), m.version_id()));

        versions
            .chain(markers)
            .filter_map(|(key, vid)| {
                ObjectIdentifier::builder()
                    .key(key?)
                    .version_id(vid?)
                    .build()
                    .ok()
            })
            .collect()
    }

    /// Build a `Config` from CLI-style args, adding the E2E profile unless
    /// explicit credentials are given.
    pub fn build_config(args: Vec<&str>) -> Config {
        let mut full_args: Vec<String> = vec!["s3vpurge".to_string()];
        full_args.extend(args.iter().map(|s| s.to_string()));

        let has_credentials = full_args
            .iter()
            .any(|a| a.starts_with("--target-profile") || a.starts_with("--target-access-key"));
        if !has_credentials {
            full_args.push("--target-profile".to_string());
            full_args.push(AWS_PROFILE.to_string());
        }

        build_config_from_args(full_args)
            .unwrap_or_else(|e| panic!("Failed to build config from args: {e}"))
    }

    pub async fn run_pipeline(config: Config) -> PipelineResult {
        let mut pipeline = DeletionPipeline::new(config)
            .await
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
}

pub mod client_builder;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::storage::{ListingMarker, Storage, StorageTrait, VersionPage};
use crate::types::error::S3vpurgeError;
use crate::types::{DeletionTask, NULL_VERSION_ID};

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// For service errors (S3 API responses), returns the S3 error code
/// (e.g. "AccessDenied", "InternalError") and the human-readable error
/// message from the response. For other error types (network, timeout,
/// construction failure), returns "N/A" as the code and the full error
/// description as the message.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

/// S3 storage backed by the AWS SDK client.
#[derive(Clone)]
pub struct S3Storage {
    bucket: String,
    client: Arc<Client>,
}

impl S3Storage {
    pub fn new(bucket: String, client: Arc<Client>) -> Self {
        Self { bucket, client }
    }

    /// Build the SDK client from `client_config` and box the storage.
    pub async fn boxed(bucket: String, client_config: &ClientConfig) -> Storage {
        let client = Arc::new(client_config.create_client().await);
        Box::new(S3Storage::new(bucket, client))
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_object_versions_page(
        &self,
        prefix: Option<&str>,
        marker: &ListingMarker,
        max_keys: i32,
    ) -> Result<VersionPage> {
        let output = self
            .client
            .list_object_versions()
            .bucket(&self.bucket)
            .set_prefix(prefix.map(str::to_string))
            .set_key_marker(marker.key_marker.clone())
            .set_version_id_marker(marker.version_id_marker.clone())
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    prefix = prefix,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectVersions API call failed for s3://{}/{}: {} ({}).",
                    self.bucket,
                    prefix.unwrap_or_default(),
                    s3_error_code,
                    s3_error_message,
                );
                anyhow!(e).context("aws_sdk_s3::client::list_object_versions() failed.")
            })?;

        version_page_from_output(&output)
    }

    async fn delete_object_version(&self, key: &str, version_id: &str) -> Result<()> {
        let object = ObjectIdentifier::builder()
            .key(key)
            .version_id(version_id)
            .build()
            .context("Failed to build ObjectIdentifier")?;

        let delete = Delete::builder()
            .set_objects(Some(vec![object]))
            .quiet(false)
            .build()
            .context("Failed to build Delete request")?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::warn!(
                    bucket = self.bucket,
                    key = key,
                    version_id = version_id,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteObjects API call failed for s3://{}/{}: {} ({}).",
                    self.bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow!(e).context("aws_sdk_s3::client::delete_objects() failed.")
            })?;

        check_delete_output(&output, key, version_id)
    }
}

/// Convert one ListObjectVersions response into a [`VersionPage`].
///
/// Entries without a key are skipped. Entries without a version id belong to
/// an unversioned bucket and are addressed with the `null` version id.
fn version_page_from_output(output: &ListObjectVersionsOutput) -> Result<VersionPage> {
    let versions = output
        .versions()
        .iter()
        .filter_map(|version| to_deletion_task(version.key(), version.version_id()))
        .collect();

    let delete_markers = output
        .delete_markers()
        .iter()
        .filter_map(|marker| to_deletion_task(marker.key(), marker.version_id()))
        .collect();

    let next_marker = if output.is_truncated() == Some(true) {
        let marker = ListingMarker {
            key_marker: output.next_key_marker().map(String::from),
            version_id_marker: output.next_version_id_marker().map(String::from),
        };
        if marker == ListingMarker::default() {
            return Err(anyhow!(S3vpurgeError::Enumeration(
                "truncated ListObjectVersions response without a next marker".to_string()
            )));
        }
        Some(marker)
    } else {
        None
    };

    Ok(VersionPage {
        versions,
        delete_markers,
        next_marker,
    })
}

fn to_deletion_task(key: Option<&str>, version_id: Option<&str>) -> Option<DeletionTask> {
    let Some(key) = key else {
        tracing::warn!(
            version_id = version_id,
            "ListObjectVersions returned an entry without a key. skipping."
        );
        return None;
    };

    Some(DeletionTask::new(
        key,
        version_id.unwrap_or(NULL_VERSION_ID),
    ))
}

/// DeleteObjects succeeds at the HTTP level even when individual keys fail.
/// Any entry in `Errors` turns into a deletion error for this version.
fn check_delete_output(output: &DeleteObjectsOutput, key: &str, version_id: &str) -> Result<()> {
    if let Some(error) = output.errors().first() {
        let code = error.code().unwrap_or("unknown");
        let message = error.message().unwrap_or("no message");
        tracing::warn!(
            key = key,
            version_id = version_id,
            s3_error_code = code,
            s3_error_message = message,
            "DeleteObjects reported a per-key failure for {}, {}.",
            key,
            version_id,
        );
        return Err(anyhow!(S3vpurgeError::Deletion(format!(
            "{code}: {message}"
        ))));
    }

    Ok(())
}

use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;

/// Version-id S3 reports for objects written while versioning was never enabled.
pub const NULL_VERSION_ID: &str = "null";

/// A single stored object version (or delete marker) to be removed.
///
/// Created by the [`VersionLister`](crate::lister::VersionLister) for each
/// listing entry and consumed exactly once by one deletion worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeletionTask {
    key: String,
    version_id: String,
}

impl DeletionTask {
    pub fn new(key: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: version_id.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version_id(&self) -> &str {
        &self.version_id
    }
}

/// Outcome of processing one [`DeletionTask`].
///
/// The `Display` form is the human-readable status line written to stdout by
/// the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionResult {
    DryRun(DeletionTask),
    Deleted(DeletionTask),
    Failed { task: DeletionTask, error: String },
}

impl DeletionResult {
    pub fn task(&self) -> &DeletionTask {
        match self {
            Self::DryRun(task) | Self::Deleted(task) => task,
            Self::Failed { task, .. } => task,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl Display for DeletionResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun(task) => {
                write!(f, "Dry run delete: {}, {}", task.key, task.version_id)
            }
            Self::Deleted(task) => write!(f, "Deleted: {}, {}", task.key, task.version_id),
            Self::Failed { task, error } => write!(
                f,
                "Unable to delete: {}, {}, err: {}",
                task.key, task.version_id, error
            ),
        }
    }
}

/// Counters shared by the lister and every deletion worker.
#[derive(Debug, Default)]
pub struct DeletionStatsReport {
    listed_objects: AtomicU64,
    deleted_objects: AtomicU64,
    dry_run_objects: AtomicU64,
    failed_objects: AtomicU64,
}

impl DeletionStatsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_listed(&self) {
        self.listed_objects.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a finished task under the bucket matching its result.
    pub fn record(&self, result: &DeletionResult) {
        let counter = match result {
            DeletionResult::DryRun(_) => &self.dry_run_objects,
            DeletionResult::Deleted(_) => &self.deleted_objects,
            DeletionResult::Failed { .. } => &self.failed_objects,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> DeletionStats {
        DeletionStats {
            stats_listed_objects: self.listed_objects.load(Ordering::SeqCst),
            stats_deleted_objects: self.deleted_objects.load(Ordering::SeqCst),
            stats_dry_run_objects: self.dry_run_objects.load(Ordering::SeqCst),
            stats_failed_objects: self.failed_objects.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of [`DeletionStatsReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionStats {
    pub stats_listed_objects: u64,
    pub stats_deleted_objects: u64,
    pub stats_dry_run_objects: u64,
    pub stats_failed_objects: u64,
}

impl DeletionStats {
    /// Number of tasks that produced a result of any kind.
    pub fn processed_objects(&self) -> u64 {
        self.stats_deleted_objects + self.stats_dry_run_objects + self.stats_failed_objects
    }
}

/// AWS configuration file locations.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigLocation {
    pub aws_config_file: Option<PathBuf>,
    pub aws_shared_credentials_file: Option<PathBuf>,
}

/// AWS credential sources.
#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

/// AWS access key pair with secure zeroization.
///
/// The secret_access_key and session_token are securely cleared from memory
/// when this struct is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}

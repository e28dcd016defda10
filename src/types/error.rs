use anyhow::Error;
use thiserror::Error;

/// Application-level error types for s3vpurge-rs.
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 1: Enumeration and pipeline failures
/// - 2: Configuration errors
///
/// `Deletion` never terminates a run; it is carried inside a failed
/// [`DeletionResult`](crate::types::DeletionResult) and the CLI reports it
/// with the warning exit code (3) instead.
#[derive(Error, Debug, PartialEq)]
pub enum S3vpurgeError {
    /// Configuration error, detected before the pipeline starts.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// ListObjectVersions failed. Terminal for the run.
    #[error("Enumeration error: {0}")]
    Enumeration(String),

    /// A single version could not be deleted.
    #[error("Deletion error: {0}")]
    Deletion(String),

    /// General pipeline error (e.g. a panicked stage).
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl S3vpurgeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            S3vpurgeError::InvalidConfig(_) => 2,
            _ => 1,
        }
    }
}

/// Check if an anyhow::Error carries an enumeration failure.
///
/// The lister attaches [`S3vpurgeError::Enumeration`] as context, so the typed
/// error may sit anywhere in the chain.
pub fn is_enumeration_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<S3vpurgeError>(),
        Some(S3vpurgeError::Enumeration(_))
    )
}

/// Check if an anyhow::Error wraps a configuration error.
pub fn is_config_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<S3vpurgeError>(),
        Some(S3vpurgeError::InvalidConfig(_))
    )
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3vpurgeError>() {
        return err.exit_code();
    }
    1
}

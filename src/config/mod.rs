pub mod args;

use crate::types::error::S3vpurgeError;
use crate::types::{ClientConfigLocation, S3Credentials};

/// Largest page S3's ListObjectVersions returns.
pub const MAX_KEYS_LIMIT: i32 = 1000;

/// Main configuration for the s3vpurge-rs deletion pipeline.
///
/// Holds the target bucket and optional key prefix, the dry-run flag, the
/// worker pool size, and the ambient settings (AWS client, tracing).
/// Constructed once and read by every stage; never mutated while a pipeline
/// runs.
///
/// # Quick Start
///
/// ```
/// use s3vpurge_rs::Config;
///
/// let config = Config::for_target("my-bucket", Some("logs/"));
/// assert_eq!(config.worker_size, 1);
/// assert_eq!(config.max_keys, 1000);
/// ```
///
/// Then customize fields as needed:
///
/// ```
/// use s3vpurge_rs::Config;
///
/// let mut config = Config::for_target("my-bucket", None);
/// config.dry_run = true;
/// config.worker_size = 16;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub prefix: Option<String>,
    pub dry_run: bool,
    pub dry_run_delay_milliseconds: u64,
    pub worker_size: u16,
    /// Bounds both the lister → worker channel and the worker → sink channel.
    pub task_queue_size: u32,
    pub max_keys: i32,
    pub target_client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    /// Create a `Config` with CLI defaults for the given bucket and prefix.
    ///
    /// An empty prefix is treated as no prefix.
    pub fn for_target(bucket: &str, prefix: Option<&str>) -> Self {
        Config {
            bucket: bucket.to_string(),
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            ..Config::default()
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), S3vpurgeError> {
        if self.bucket.is_empty() {
            return Err(S3vpurgeError::InvalidConfig(
                "Bucket name required.".to_string(),
            ));
        }
        if self.worker_size == 0 {
            return Err(S3vpurgeError::InvalidConfig(
                "Worker size must be at least 1.".to_string(),
            ));
        }
        if self.task_queue_size == 0 {
            return Err(S3vpurgeError::InvalidConfig(
                "Task queue size must be at least 1.".to_string(),
            ));
        }
        if !(1..=MAX_KEYS_LIMIT).contains(&self.max_keys) {
            return Err(S3vpurgeError::InvalidConfig(format!(
                "Max keys must be between 1 and {MAX_KEYS_LIMIT}."
            )));
        }
        Ok(())
    }

    /// `s3://bucket/prefix` form used in log messages.
    pub fn target_display(&self) -> String {
        format!(
            "s3://{}/{}",
            self.bucket,
            self.prefix.as_deref().unwrap_or_default()
        )
    }
}

impl Default for Config {
    /// The `bucket` defaults to empty and must be set before running.
    fn default() -> Self {
        Config {
            bucket: String::new(),
            prefix: None,
            dry_run: false,
            dry_run_delay_milliseconds: 2000,
            worker_size: 1,
            task_queue_size: 1,
            max_keys: MAX_KEYS_LIMIT,
            target_client_config: None,
            tracing_config: None,
            auto_complete_shell: None,
        }
    }
}

/// AWS S3 client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_config_location: ClientConfigLocation,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub cli_timeout_config: CLITimeoutConfig,
}

impl Default for ClientConfig {
    /// Credentials and region resolved from the environment.
    fn default() -> Self {
        ClientConfig {
            client_config_location: ClientConfigLocation::default(),
            credential: S3Credentials::FromEnvironment,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            cli_timeout_config: CLITimeoutConfig::default(),
        }
    }
}

/// Timeout configuration for AWS SDK operations.
#[derive(Debug, Clone, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

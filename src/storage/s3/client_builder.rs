use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, ConfigLoader};
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};

use crate::config::{CLITimeoutConfig, ClientConfig};
use crate::types::S3Credentials;

const CREDENTIALS_PROVIDER_NAME: &str = "s3vpurge";

impl ClientConfig {
    /// Build an S3 client from this configuration.
    ///
    /// No network calls are made here; credentials are resolved lazily on the
    /// first request.
    pub async fn create_client(&self) -> Client {
        let sdk_config = self.load_config_loader().load().await;

        let mut s3_config_builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(self.force_path_style);
        s3_config_builder.set_endpoint_url(self.endpoint_url.clone());

        Client::from_conf(s3_config_builder.build())
    }

    fn load_config_loader(&self) -> ConfigLoader {
        let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
            .timeout_config(build_timeout_config(&self.cli_timeout_config));

        if let Some(profile_files) = self.build_profile_files() {
            config_loader = config_loader.profile_files(profile_files);
        }

        config_loader = match &self.credential {
            S3Credentials::Profile(profile_name) => config_loader.profile_name(profile_name),
            S3Credentials::Credentials { access_keys } => {
                config_loader.credentials_provider(Credentials::new(
                    access_keys.access_key.clone(),
                    access_keys.secret_access_key.clone(),
                    access_keys.session_token.clone(),
                    None,
                    CREDENTIALS_PROVIDER_NAME,
                ))
            }
            S3Credentials::FromEnvironment => config_loader,
        };

        if let Some(region) = &self.region {
            config_loader = config_loader.region(Region::new(region.clone()));
        }

        config_loader
    }

    fn build_profile_files(&self) -> Option<EnvConfigFiles> {
        let location = &self.client_config_location;
        if location.aws_config_file.is_none() && location.aws_shared_credentials_file.is_none() {
            return None;
        }

        let mut builder = EnvConfigFiles::builder();
        builder = match &location.aws_config_file {
            Some(path) => builder.with_file(EnvConfigFileKind::Config, path),
            None => builder.include_default_config_file(true),
        };
        builder = match &location.aws_shared_credentials_file {
            Some(path) => builder.with_file(EnvConfigFileKind::Credentials, path),
            None => builder.include_default_credentials_file(true),
        };

        Some(builder.build())
    }
}

fn build_timeout_config(timeout_config: &CLITimeoutConfig) -> TimeoutConfig {
    let mut builder = TimeoutConfig::builder();
    builder
        .set_operation_timeout(
            timeout_config
                .operation_timeout_milliseconds
                .map(Duration::from_millis),
        )
        .set_operation_attempt_timeout(
            timeout_config
                .operation_attempt_timeout_milliseconds
                .map(Duration::from_millis),
        )
        .set_connect_timeout(
            timeout_config
                .connect_timeout_milliseconds
                .map(Duration::from_millis),
        )
        .set_read_timeout(
            timeout_config
                .read_timeout_milliseconds
                .map(Duration::from_millis),
        );

    builder.build()
}

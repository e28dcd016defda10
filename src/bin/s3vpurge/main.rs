use std::io::Write;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, info, trace};

use s3vpurge_rs::config::Config;
use s3vpurge_rs::{CLIArgs, DeletionPipeline, exit_code_from_error};

mod result_printer;
mod tracing_init;

use result_printer::ResultPrinter;

const EXIT_CODE_WARNING: i32 = 3;

const DRY_RUN_NOTICE: &str = "Performing a dry run. No object versions will be deleted.";

/// s3vpurge - Delete every object version and delete marker in an S3 bucket.
///
/// This binary is a thin wrapper over the s3vpurge-rs library.
/// All core functionality is implemented in the library crate.
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "s3vpurge",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    if is_dry_run_notice_needed(&config) {
        let _ = writeln!(std::io::stderr(), "{DRY_RUN_NOTICE}");
    }

    trace!("config = {:?}", config);

    run(config).await
}

fn load_config_exit_if_err() -> Config {
    match Config::try_from(CLIArgs::parse()) {
        Ok(config) => config,
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    }
}

/// The pipeline logs the dry-run notice at info level. When that level is
/// silenced the notice is written to stderr directly.
fn is_dry_run_notice_needed(config: &Config) -> bool {
    config.dry_run
        && config
            .tracing_config
            .as_ref()
            .is_none_or(|tracing_config| tracing_config.tracing_level < log::Level::Info)
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing_init::init_tracing(tracing_config);
    true
}

async fn run(config: Config) -> Result<()> {
    let start_time = tokio::time::Instant::now();
    debug!("deletion pipeline start.");

    let mut pipeline = match DeletionPipeline::new(config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(exit_code_from_error(&e));
        }
    };
    let mut printer = ResultPrinter::new(std::io::stdout());

    pipeline.run(&mut printer).await;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    let stats = pipeline.get_deletion_stats();

    if pipeline.has_error() {
        for err in pipeline.get_errors_and_consume().unwrap_or_default() {
            error!("{:#}", err);
        }
        error!(duration_sec = duration_sec, "s3vpurge failed.");
        return Err(anyhow::anyhow!("s3vpurge failed."));
    }

    info!(
        duration_sec = duration_sec,
        listed = stats.stats_listed_objects,
        deleted = stats.stats_deleted_objects,
        dry_run = stats.stats_dry_run_objects,
        failed = stats.stats_failed_objects,
        "s3vpurge has been completed."
    );

    if printer.failed_results() > 0 {
        std::process::exit(EXIT_CODE_WARNING);
    }

    Ok(())
}

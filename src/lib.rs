/*!
# Overview
s3vpurge-rs deletes every stored object version and delete marker under an
optional key prefix in an Amazon S3 bucket.

## Features
- **Complete purge**: Live versions, noncurrent versions and delete markers
- **Streaming**: Listing pages feed a bounded channel; memory stays flat for any bucket size
- **Concurrent**: A fixed pool of deletion workers shares one task queue
- **Dry run**: Report every version that would be deleted without touching the bucket
- **Library-First**: The s3vpurge CLI is a thin wrapper over this crate

## As a Library

```toml
[dependencies]
s3vpurge-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3vpurge_rs::config::args::parse_from_args;
use s3vpurge_rs::{Config, DeletionPipeline, DeletionResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = vec!["s3vpurge", "--bucket", "my-bucket", "--prefix", "logs/", "--dry-run"];

    let parsed_args = parse_from_args(args)?;
    let config = Config::try_from(parsed_args).map_err(anyhow::Error::msg)?;
    let mut pipeline = DeletionPipeline::new(config).await?;

    let mut results: Vec<DeletionResult> = Vec::new();
    pipeline.run(&mut results).await;

    for result in &results {
        println!("{result}");
    }
    if pipeline.has_error() {
        eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
    }
    Ok(())
}
```
*/

pub mod config;
pub mod deleter;
pub mod lister;
pub mod pipeline;
pub mod sink;
pub mod stage;
pub mod storage;
pub mod types;


pub use config::Config;
pub use config::args::CLIArgs;
pub use pipeline::{DeletionPipeline, PipelineState};
pub use sink::{ResultHandler, ResultSink};
pub use storage::{ListingMarker, Storage, StorageTrait, VersionPage};
pub use types::error::{
    S3vpurgeError, exit_code_from_error, is_config_error, is_enumeration_error,
};
pub use types::{DeletionResult, DeletionStats, DeletionTask};

//! Deletion pipeline orchestrator.
//!
//! Creates and connects all pipeline stages: List → Delete (× N) → Sink.
//!
//! The pipeline uses a streaming architecture with bounded async channels
//! between stages. Multiple ObjectVersionDeleter workers run concurrently
//! using an MPMC (multi-producer, multi-consumer) channel pattern. The task
//! channel is the only backpressure point between listing and deletion.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::deleter::ObjectVersionDeleter;
use crate::lister::VersionLister;
use crate::sink::{ResultHandler, ResultSink};
use crate::stage::Stage;
use crate::storage::{self, Storage};
use crate::types::error::S3vpurgeError;
use crate::types::{DeletionResult, DeletionStats, DeletionStatsReport, DeletionTask};

/// Lifecycle of a [`DeletionPipeline`].
///
/// `Idle → Enumerating → Draining → Done | Failed`. `Draining` is entered
/// once the task channel is closed; `Done` / `Failed` once the result stream
/// has closed and every stage has been joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Enumerating,
    Draining,
    Done,
    Failed,
}

/// The core deletion pipeline orchestrator.
///
/// ## Pipeline stages
///
/// ```text
/// VersionLister → ObjectVersionDeleter Workers (MPMC) → ResultSink → ResultHandler
/// ```
///
/// ## Usage
///
/// ```no_run
/// # // Example (will not actually run without AWS credentials)
/// # async fn example() -> anyhow::Result<()> {
/// use s3vpurge_rs::{Config, DeletionPipeline, DeletionResult};
///
/// let config = Config::for_target("my-bucket", Some("logs/"));
/// let mut pipeline = DeletionPipeline::new(config).await?;
/// let mut results: Vec<DeletionResult> = Vec::new();
/// pipeline.run(&mut results).await;
/// if pipeline.has_error() {
///     eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DeletionPipeline {
    config: Config,
    target: Storage,
    state: Arc<Mutex<PipelineState>>,
    has_error: Arc<AtomicBool>,
    has_panic: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<anyhow::Error>>>,
    ready: bool,
    deletion_stats_report: Arc<DeletionStatsReport>,
}

impl DeletionPipeline {
    /// Create a new DeletionPipeline backed by S3.
    ///
    /// Fails with [`S3vpurgeError::InvalidConfig`] before any client is built
    /// if the configuration cannot run.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let target = storage::create_storage(&config).await;

        Self::with_storage(config, target)
    }

    /// Create a DeletionPipeline over an existing storage.
    pub fn with_storage(config: Config, target: Storage) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            target,
            state: Arc::new(Mutex::new(PipelineState::Idle)),
            has_error: Arc::new(AtomicBool::new(false)),
            has_panic: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::new())),
            ready: true,
            deletion_stats_report: Arc::new(DeletionStatsReport::new()),
        })
    }

    /// Run the deletion pipeline, delivering every result to `handler`.
    ///
    /// 1. Announce a dry run and pause for `dry_run_delay_milliseconds`
    /// 2. Spawn the lister and `worker_size` deletion workers
    /// 3. Drain results into `handler` until every worker has finished
    /// 4. Join the lister and record its outcome
    ///
    /// Errors are recorded, not returned: check [`has_error`](Self::has_error)
    /// afterwards. Results produced before a listing failure are still
    /// delivered.
    pub async fn run(&mut self, handler: &mut dyn ResultHandler) {
        assert!(self.ready, "DeletionPipeline::run() called more than once");
        self.ready = false;

        if self.config.dry_run {
            self.announce_dry_run().await;
        }

        info!(
            path = %self.config.target_display(),
            worker_size = self.config.worker_size,
            dry_run = self.config.dry_run,
            "deletion pipeline has started."
        );
        self.set_state(PipelineState::Enumerating);

        // Stage 1: List object versions
        let (lister_handle, tasks) = self.list_target();

        // Stage 2: Spawn deletion workers and the watcher that closes results
        let (watcher_handle, results) = self.delete_objects(tasks);

        // Stage 3: Drain results in the caller's task
        let delivered = ResultSink::new(results).drain(handler).await;

        if let Err(e) = watcher_handle.await {
            self.record_panic(format!("worker watcher task panicked: {e}"));
        }
        if let Err(e) = lister_handle.await {
            self.record_panic(format!("object version lister task panicked: {e}"));
        }

        let stats = self.get_deletion_stats();
        if self.has_error() {
            self.set_state(PipelineState::Failed);
            error!(
                delivered,
                listed = stats.stats_listed_objects,
                "deletion pipeline has failed."
            );
        } else {
            self.set_state(PipelineState::Done);
            info!(
                delivered,
                listed = stats.stats_listed_objects,
                deleted = stats.stats_deleted_objects,
                dry_run = stats.stats_dry_run_objects,
                failed = stats.stats_failed_objects,
                "deletion pipeline has been completed."
            );
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap()
    }

    /// Check if any error occurred during the pipeline execution.
    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    /// Check if any spawned task panicked during the pipeline execution.
    pub fn has_panic(&self) -> bool {
        self.has_panic.load(Ordering::SeqCst)
    }

    /// Consume and return all accumulated errors.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_errors_and_consume(&self) -> Option<Vec<anyhow::Error>> {
        if !self.has_error() {
            return None;
        }
        let mut error_list = self.errors.lock().unwrap();
        let mut errors = Vec::with_capacity(error_list.len());
        while let Some(e) = error_list.pop_front() {
            errors.push(e);
        }
        Some(errors)
    }

    /// Get error messages without consuming them.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_error_messages(&self) -> Option<Vec<String>> {
        if !self.has_error() {
            return None;
        }
        let error_list = self.errors.lock().unwrap();
        Some(error_list.iter().map(|e| e.to_string()).collect())
    }

    /// Get a snapshot of the current deletion statistics.
    pub fn get_deletion_stats(&self) -> DeletionStats {
        self.deletion_stats_report.snapshot()
    }

    // -----------------------------------------------------------------------
    // Internal methods
    // -----------------------------------------------------------------------

    async fn announce_dry_run(&self) {
        info!(
            delay_milliseconds = self.config.dry_run_delay_milliseconds,
            "Performing a dry run. No object versions will be deleted."
        );
        if self.config.dry_run_delay_milliseconds > 0 {
            tokio::time::sleep(Duration::from_millis(
                self.config.dry_run_delay_milliseconds,
            ))
            .await;
        }
    }

    fn set_state(&self, state: PipelineState) {
        set_state(&self.state, state);
    }

    /// Record an error and set the error flag.
    fn record_error(&self, error: anyhow::Error) {
        self.has_error.store(true, Ordering::SeqCst);
        self.errors.lock().unwrap().push_back(error);
    }

    fn record_panic(&self, message: String) {
        self.has_panic.store(true, Ordering::SeqCst);
        error!("{}", message);
        self.record_error(anyhow!(S3vpurgeError::Pipeline(message)));
    }

    // -----------------------------------------------------------------------
    // Pipeline stages
    // -----------------------------------------------------------------------

    /// Stage 1: Spawn the VersionLister.
    ///
    /// The lister owns the only task sender; the task channel closes when the
    /// inner task ends, whether listing succeeded, failed or panicked.
    fn list_target(&self) -> (JoinHandle<()>, Receiver<DeletionTask>) {
        let (sender, receiver) =
            async_channel::bounded::<DeletionTask>(self.config.task_queue_size as usize);
        let stage = Stage::new(
            self.config.clone(),
            self.target.clone(),
            None,
            Some(sender),
        );
        let lister = VersionLister::new(stage, self.deletion_stats_report.clone());

        let state = self.state.clone();
        let has_error = self.has_error.clone();
        let has_panic = self.has_panic.clone();
        let error_list = self.errors.clone();

        let handle = tokio::spawn(async move {
            let join_result = tokio::spawn(async move { lister.list_target().await }).await;
            set_state(&state, PipelineState::Draining);

            match join_result {
                Ok(Ok(())) => {
                    debug!("object version lister completed successfully.");
                }
                Ok(Err(e)) => {
                    has_error.store(true, Ordering::SeqCst);
                    error!("object version lister failed: {:#}", e);
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!("object version lister task panicked: {}", e);
                    error_list.lock().unwrap().push_back(anyhow!(S3vpurgeError::Pipeline(
                        format!("object version lister task panicked: {e}")
                    )));
                }
            }
        });

        (handle, receiver)
    }

    /// Stage 2: Spawn ObjectVersionDeleter workers using MPMC pattern.
    ///
    /// Spawns `worker_size` workers reading from the same task channel, plus a
    /// watcher that joins every worker and then closes the result channel.
    fn delete_objects(
        &self,
        tasks: Receiver<DeletionTask>,
    ) -> (JoinHandle<()>, Receiver<DeletionResult>) {
        // The result channel shares the task channel's bound.
        let (sender, next_stage_receiver) =
            async_channel::bounded::<DeletionResult>(self.config.task_queue_size as usize);

        let mut worker_handles = Vec::with_capacity(self.config.worker_size as usize);
        for worker_index in 0..self.config.worker_size {
            let stage = self.create_mpmc_stage(tasks.clone(), sender.clone());
            let deleter =
                ObjectVersionDeleter::new(stage, worker_index, self.deletion_stats_report.clone());

            debug!(worker_index, "starting delete worker.");
            worker_handles.push((
                worker_index,
                tokio::spawn(async move { deleter.delete().await }),
            ));
        }
        info!(
            worker_size = self.config.worker_size,
            "all delete workers started."
        );

        // Workers hold the remaining receivers. If they all exit early the
        // task channel closes and the lister stops.
        drop(tasks);

        let watcher = spawn_worker_watcher(
            worker_handles,
            sender,
            self.has_error.clone(),
            self.has_panic.clone(),
            self.errors.clone(),
        );

        (watcher, next_stage_receiver)
    }

    fn create_mpmc_stage(
        &self,
        receiver: Receiver<DeletionTask>,
        sender: Sender<DeletionResult>,
    ) -> Stage<DeletionResult> {
        Stage::new(
            self.config.clone(),
            self.target.clone(),
            Some(receiver),
            Some(sender),
        )
    }
}

fn set_state(state: &Mutex<PipelineState>, next: PipelineState) {
    let mut current = state.lock().unwrap();
    debug!(from = ?*current, to = ?next, "pipeline state changed.");
    *current = next;
}

/// Join every worker in order, then close the result channel exactly once.
fn spawn_worker_watcher(
    worker_handles: Vec<(u16, JoinHandle<Result<()>>)>,
    sender: Sender<DeletionResult>,
    has_error: Arc<AtomicBool>,
    has_panic: Arc<AtomicBool>,
    error_list: Arc<Mutex<VecDeque<anyhow::Error>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for (worker_index, handle) in worker_handles {
            match handle.await {
                Ok(Ok(())) => {
                    debug!(worker_index, "delete worker completed successfully.");
                }
                Ok(Err(e)) => {
                    has_error.store(true, Ordering::SeqCst);
                    error!(worker_index, "delete worker failed: {:#}", e);
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!(worker_index, "delete worker task panicked: {}", e);
                    error_list.lock().unwrap().push_back(anyhow!(S3vpurgeError::Pipeline(
                        format!("delete worker {worker_index} panicked: {e}")
                    )));
                }
            }
        }

        sender.close();
        debug!("all delete workers have been completed. result channel closed.");
    })
}

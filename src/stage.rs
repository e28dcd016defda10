use anyhow::{Context, Result, anyhow};
use async_channel::{Receiver, Sender};

use crate::config::Config;
use crate::storage::Storage;
use crate::types::DeletionTask;

/// Result of sending an item to the next stage.
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Success,
    Closed,
}

/// Shared context passed to each pipeline stage.
///
/// - Channels connect stages: each stage reads from `receiver` and writes to `sender`
/// - The lister has no `receiver` (it's the pipeline entry point)
/// - Deletion workers read [`DeletionTask`]s and write `T` (their results)
///
/// Each stage takes ownership of a `Stage`, consuming it during pipeline
/// construction. Dropping the stage drops its sender, which is how the lister
/// closes the task channel.
pub struct Stage<T> {
    pub config: Config,
    pub target: Storage,
    pub receiver: Option<Receiver<DeletionTask>>,
    pub sender: Option<Sender<T>>,
}

impl<T> Stage<T> {
    pub fn new(
        config: Config,
        target: Storage,
        receiver: Option<Receiver<DeletionTask>>,
        sender: Option<Sender<T>>,
    ) -> Self {
        Self {
            config,
            target,
            receiver,
            sender,
        }
    }

    /// Send an item to the next stage via the sender channel.
    ///
    /// Returns `SendResult::Closed` if the downstream channel has been closed,
    /// allowing the caller to exit gracefully.
    pub async fn send(&self, item: T) -> Result<SendResult> {
        let sender = self
            .sender
            .as_ref()
            .context("stage has no downstream channel.")?;

        match sender.send(item).await {
            Ok(()) => Ok(SendResult::Success),
            Err(_) if sender.is_closed() => Ok(SendResult::Closed),
            Err(_) => Err(anyhow!("async_channel::Sender::send() failed.")),
        }
    }
}

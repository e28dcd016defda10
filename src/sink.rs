//! Result sink for the deletion pipeline.
//!
//! The sink is the fan-in point: it drains the result channel in arrival order
//! and hands each [`DeletionResult`] to a caller-supplied [`ResultHandler`].
//! Draining continues until every worker has finished and the channel is
//! closed, so upstream stages never block on a full result channel.

use async_channel::Receiver;
use async_trait::async_trait;
use tracing::debug;

use crate::types::DeletionResult;

/// Receives every result produced by the pipeline, one at a time.
#[async_trait]
pub trait ResultHandler: Send {
    async fn handle(&mut self, result: DeletionResult);
}

/// Collects results in arrival order.
#[async_trait]
impl ResultHandler for Vec<DeletionResult> {
    async fn handle(&mut self, result: DeletionResult) {
        self.push(result);
    }
}

/// Terminal stage that drains the result channel into a [`ResultHandler`].
#[derive(Debug)]
pub struct ResultSink {
    receiver: Receiver<DeletionResult>,
}

impl ResultSink {
    pub fn new(receiver: Receiver<DeletionResult>) -> Self {
        Self { receiver }
    }

    /// Consume all results until the channel closes. Returns the number of
    /// results delivered to `handler`.
    pub async fn drain(&self, handler: &mut dyn ResultHandler) -> u64 {
        debug!("result sink has started.");

        let mut delivered = 0;
        while let Ok(result) = self.receiver.recv().await {
            handler.handle(result).await;
            delivered += 1;
        }

        debug!(delivered, "result sink has been completed.");
        delivered
    }
}

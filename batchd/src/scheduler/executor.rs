//! Item executor trait and the default simulated executor

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while executing one item
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Item {item_id} failed: {reason}")]
    ItemFailed { item_id: u64, reason: String },

    #[error("Item {item_id} panicked: {message}")]
    Panicked { item_id: u64, message: String },
}

/// Performs the unit of work for a single item
///
/// Items are never retried; an error aborts the owning batch.
#[async_trait]
pub trait ItemExecutor: Send + Sync {
    async fn execute(&self, item_id: u64) -> Result<(), ExecutorError>;
}

/// Simulates an external call with a fixed latency; always succeeds
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    latency: Duration,
}

impl SimulatedExecutor {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl ItemExecutor for SimulatedExecutor {
    async fn execute(&self, item_id: u64) -> Result<(), ExecutorError> {
        debug!(item_id, latency_ms = self.latency.as_millis() as u64, "SimulatedExecutor::execute: called");
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

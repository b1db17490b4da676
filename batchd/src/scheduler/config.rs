//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max ids per batch
    #[serde(rename = "max-batch-size", default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Minimum spacing between the end of one batch and the start of the next
    #[serde(rename = "cooldown-ms", default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Simulated latency per item
    #[serde(rename = "item-latency-ms", default = "default_item_latency_ms")]
    pub item_latency_ms: u64,
}

fn default_max_batch_size() -> usize {
    3
}

fn default_cooldown_ms() -> u64 {
    5_000
}

fn default_item_latency_ms() -> u64 {
    500
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            cooldown_ms: default_cooldown_ms(),
            item_latency_ms: default_item_latency_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Get the cooldown as a Duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Get the per-item latency as a Duration
    pub fn item_latency(&self) -> Duration {
        Duration::from_millis(self.item_latency_ms)
    }
}

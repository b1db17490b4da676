//! Scheduler for batch execution
//!
//! Splits ingestions into batches, orders them by priority and drains them
//! one at a time with a fixed cooldown between batches.

mod config;
mod core;
mod executor;
mod queue;

pub use config::SchedulerConfig;
pub use core::Scheduler;
pub use executor::{ExecutorError, ItemExecutor, SimulatedExecutor};
pub use queue::{BatchQueue, QueueEntry, QueueState, SchedulerStats};

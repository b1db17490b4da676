//! batchd - priority-ordered, rate-limited batch ingestion
//!
//! Ingestion requests are split into fixed-size batches, queued by priority
//! and drained by a single worker with a minimum spacing between batches.
//! Status of each ingestion is derived on demand from its batches.
//!
//! # Modules
//!
//! - [`domain`] - Ingestion, Batch, Priority and ids
//! - [`store`] - In-memory record store
//! - [`scheduler`] - Priority queue, item executor and drain loop
//! - [`api`] - HTTP transport
//! - [`client`] - HTTP client for the CLI
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use domain::{BatchId, BatchStatus, BatchView, IngestionId, IngestionState, IngestionStatus, Priority};
pub use scheduler::{ExecutorError, ItemExecutor, Scheduler, SchedulerConfig, SimulatedExecutor};
pub use store::{BatchStore, StoreError};

//! Domain types for batchd
//!
//! Core domain types: Ingestion, Batch, Priority and their identifiers.

mod batch;
mod id;
mod priority;

pub use batch::{Batch, BatchStatus, BatchView, Ingestion, IngestionState, IngestionStatus, derive_status};
pub use id::{BatchId, IngestionId};
pub use priority::Priority;

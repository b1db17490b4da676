//! Batch record store
//!
//! Holds the mutable status of every ingestion and batch.

mod records;

pub use records::{BatchStore, StoreError, split_ids};

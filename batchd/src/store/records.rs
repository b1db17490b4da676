//! BatchStore - in-memory record store for ingestions and batches
//!
//! The store is the single source of truth for status queries. It has no
//! locking of its own: the scheduler owns it behind the same mutex that
//! guards the queue, so a reader never observes a half-applied write.

use std::collections::HashMap;

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{
    Batch, BatchId, BatchStatus, BatchView, Ingestion, IngestionId, IngestionStatus, Priority, derive_status,
};

/// Errors from store mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Batch not found: {0}")]
    BatchNotFound(BatchId),

    #[error("Invalid transition for batch {batch_id}: {from} -> {to}")]
    InvalidTransition {
        batch_id: BatchId,
        from: BatchStatus,
        to: BatchStatus,
    },
}

/// Split `ids` into consecutive chunks of at most `max_batch_size`
///
/// Order is preserved and nothing is dropped or duplicated.
pub fn split_ids(ids: &[u64], max_batch_size: usize) -> Vec<Vec<u64>> {
    ids.chunks(max_batch_size.max(1)).map(<[u64]>::to_vec).collect()
}

/// In-memory ingestion and batch records
#[derive(Debug)]
pub struct BatchStore {
    max_batch_size: usize,
    ingestions: HashMap<IngestionId, Ingestion>,
    batches: HashMap<BatchId, Batch>,
    next_seq: u64,
}

impl BatchStore {
    /// Create an empty store splitting ingestions into batches of `max_batch_size`
    pub fn new(max_batch_size: usize) -> Self {
        debug!(max_batch_size, "BatchStore::new: called");
        Self {
            max_batch_size: max_batch_size.max(1),
            ingestions: HashMap::new(),
            batches: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Create an ingestion and its pending batches
    ///
    /// Returns the new ingestion id. Zero ids produce an ingestion with no batches.
    pub fn create_ingestion(&mut self, ids: &[u64], priority: Priority) -> IngestionId {
        debug!(count = ids.len(), ?priority, "BatchStore::create_ingestion: called");
        let ingestion_id = IngestionId::generate();
        let seq = self.next_seq;
        self.next_seq += 1;

        let mut batch_ids = Vec::new();
        for (position, items) in split_ids(ids, self.max_batch_size).into_iter().enumerate() {
            let batch = Batch {
                id: BatchId::generate(),
                ingestion_id: ingestion_id.clone(),
                items,
                status: BatchStatus::Pending,
                priority,
                seq,
                position,
                started_at: None,
                finished_at: None,
            };
            batch_ids.push(batch.id.clone());
            self.batches.insert(batch.id.clone(), batch);
        }

        debug!(%ingestion_id, batches = batch_ids.len(), seq, "BatchStore::create_ingestion: created");
        self.ingestions.insert(
            ingestion_id.clone(),
            Ingestion {
                id: ingestion_id.clone(),
                batch_ids,
                seq,
            },
        );
        ingestion_id
    }

    /// Get an ingestion record
    pub fn ingestion(&self, id: &IngestionId) -> Option<&Ingestion> {
        self.ingestions.get(id)
    }

    /// Get a batch record
    pub fn batch(&self, id: &BatchId) -> Option<&Batch> {
        self.batches.get(id)
    }

    /// Batches of an ingestion in split order
    pub fn batches_of(&self, id: &IngestionId) -> Vec<&Batch> {
        self.ingestions
            .get(id)
            .map(|ing| ing.batch_ids.iter().filter_map(|b| self.batches.get(b)).collect())
            .unwrap_or_default()
    }

    /// Build the status view of an ingestion, deriving its overall status
    pub fn ingestion_status(&self, id: &IngestionId) -> Option<IngestionStatus> {
        debug!(%id, "BatchStore::ingestion_status: called");
        let ingestion = self.ingestions.get(id)?;
        let batches: Vec<BatchView> = ingestion
            .batch_ids
            .iter()
            .filter_map(|batch_id| self.batches.get(batch_id))
            .map(|batch| BatchView {
                batch_id: batch.id.clone(),
                ids: batch.items.clone(),
                status: batch.status,
            })
            .collect();

        Some(IngestionStatus {
            ingestion_id: ingestion.id.clone(),
            status: derive_status(batches.iter().map(|b| b.status)),
            batches,
        })
    }

    /// Move a batch forward to `status`, stamping transition times
    pub fn set_batch_status(&mut self, id: &BatchId, status: BatchStatus) -> Result<(), StoreError> {
        debug!(%id, %status, "BatchStore::set_batch_status: called");
        let batch = self
            .batches
            .get_mut(id)
            .ok_or_else(|| StoreError::BatchNotFound(id.clone()))?;

        if !batch.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                batch_id: id.clone(),
                from: batch.status,
                to: status,
            });
        }

        let now = Instant::now();
        match status {
            BatchStatus::Running => batch.started_at = Some(now),
            BatchStatus::Done | BatchStatus::Failed => batch.finished_at = Some(now),
            BatchStatus::Pending => {}
        }
        batch.status = status;
        Ok(())
    }

    /// Number of ingestions held
    pub fn ingestion_count(&self) -> usize {
        self.ingestions.len()
    }

    /// Drop every record
    pub fn clear(&mut self) {
        debug!("BatchStore::clear: called");
        self.ingestions.clear();
        self.batches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IngestionState;
    use proptest::prelude::*;

    #[test]
    fn test_split_seven_ids_by_three() {
        let ids: Vec<u64> = (1..=7).collect();
        assert_eq!(split_ids(&ids, 3), vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[test]
    fn test_empty_ingestion_is_done() {
        let mut store = BatchStore::new(3);
        let id = store.create_ingestion(&[], Priority::Low);

        let status = store.ingestion_status(&id).unwrap();
        assert!(status.batches.is_empty());
        assert_eq!(status.status, IngestionState::Done);
    }

    #[test]
    fn test_create_ingestion_records_pending_batches() {
        let mut store = BatchStore::new(3);
        let id = store.create_ingestion(&[10, 20, 30, 40], Priority::High);

        let status = store.ingestion_status(&id).unwrap();
        assert_eq!(status.status, IngestionState::Pending);
        assert_eq!(status.batches.len(), 2);
        assert_eq!(status.batches[0].ids, vec![10, 20, 30]);
        assert_eq!(status.batches[1].ids, vec![40]);

        let batches = store.batches_of(&id);
        assert!(batches.iter().all(|b| b.priority == Priority::High));
        assert_eq!(batches[0].position, 0);
        assert_eq!(batches[1].position, 1);
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let mut store = BatchStore::new(3);
        let a = store.create_ingestion(&[1], Priority::Low);
        let b = store.create_ingestion(&[2], Priority::Low);
        assert!(store.ingestion(&a).unwrap().seq < store.ingestion(&b).unwrap().seq);
    }

    #[test]
    fn test_unknown_ingestion_is_none() {
        let store = BatchStore::new(3);
        assert!(store.ingestion_status(&IngestionId::from("missing")).is_none());
    }

    #[tokio::test]
    async fn test_set_batch_status_enforces_order() {
        let mut store = BatchStore::new(3);
        let id = store.create_ingestion(&[1, 2], Priority::Medium);
        let batch_id = store.batches_of(&id)[0].id.clone();

        // Skipping running is rejected
        assert_eq!(
            store.set_batch_status(&batch_id, BatchStatus::Done),
            Err(StoreError::InvalidTransition {
                batch_id: batch_id.clone(),
                from: BatchStatus::Pending,
                to: BatchStatus::Done,
            })
        );

        store.set_batch_status(&batch_id, BatchStatus::Running).unwrap();
        assert_eq!(store.ingestion_status(&id).unwrap().status, IngestionState::Running);
        assert!(store.batch(&batch_id).unwrap().started_at.is_some());

        store.set_batch_status(&batch_id, BatchStatus::Done).unwrap();
        assert_eq!(store.ingestion_status(&id).unwrap().status, IngestionState::Done);
        assert!(store.batch(&batch_id).unwrap().finished_at.is_some());

        // No regression
        assert!(store.set_batch_status(&batch_id, BatchStatus::Running).is_err());
    }

    #[test]
    fn test_set_status_unknown_batch() {
        let mut store = BatchStore::new(3);
        let missing = BatchId::from("nope");
        assert_eq!(
            store.set_batch_status(&missing, BatchStatus::Running),
            Err(StoreError::BatchNotFound(missing))
        );
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut store = BatchStore::new(3);
        let id = store.create_ingestion(&[1, 2, 3, 4], Priority::Low);
        store.clear();
        assert_eq!(store.ingestion_count(), 0);
        assert!(store.ingestion_status(&id).is_none());
    }

    proptest! {
        #[test]
        fn prop_split_partitions_in_order(
            ids in proptest::collection::vec(1u64..=1_000_000_007, 0..50),
            max in 1usize..6,
        ) {
            let chunks = split_ids(&ids, max);

            prop_assert_eq!(chunks.len(), ids.len().div_ceil(max));
            prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= max));
            let flattened: Vec<u64> = chunks.into_iter().flatten().collect();
            prop_assert_eq!(flattened, ids);
        }
    }
}

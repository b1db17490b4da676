//! Queue types for the scheduler

use std::collections::{BinaryHeap, HashSet};

use crate::domain::{Batch, BatchId, Priority};

/// Ordering reference to a pending batch
///
/// The batch's authoritative status lives in the store, not here.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub batch_id: BatchId,
    pub priority: Priority,
    /// Submission sequence number of the owning ingestion
    pub seq: u64,
    /// Position of the batch within its ingestion
    pub position: usize,
}

impl From<&Batch> for QueueEntry {
    fn from(batch: &Batch) -> Self {
        Self {
            batch_id: batch.id.clone(),
            priority: batch.priority,
            seq: batch.seq,
            position: batch.position,
        }
    }
}

impl Eq for QueueEntry {}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher priority first, then earlier submission, then split order
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending batches ordered by priority, then submission order
#[derive(Debug, Default)]
pub struct BatchQueue {
    heap: BinaryHeap<QueueEntry>,
    /// Ids currently in the heap
    queued: HashSet<BatchId>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; returns false if the batch is already queued
    pub fn enqueue(&mut self, entry: QueueEntry) -> bool {
        if !self.queued.insert(entry.batch_id.clone()) {
            return false;
        }
        self.heap.push(entry);
        true
    }

    /// Remove and return the highest-priority, earliest-submitted entry
    pub fn pop_highest(&mut self) -> Option<QueueEntry> {
        let entry = self.heap.pop()?;
        self.queued.remove(&entry.batch_id);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.queued.clear();
    }
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub batches_completed: u64,
    pub batches_failed: u64,
    pub batches_skipped: u64,
    pub items_executed: u64,
    pub peak_queue_depth: usize,
}

/// Point-in-time view of the scheduler
#[derive(Debug, Clone)]
pub struct QueueState {
    pub queued: usize,
    pub draining: bool,
    pub stats: SchedulerStats,
}

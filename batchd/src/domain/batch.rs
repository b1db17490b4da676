//! Batch and Ingestion records
//!
//! A Batch is mutated only by the scheduler loop and moves forward through
//! `pending -> running -> {done | failed}`. An Ingestion never stores its own
//! status; it is derived from its batches on every read.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::id::{BatchId, IngestionId};
use super::priority::Priority;

/// Batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Waiting in the queue
    #[default]
    Pending,
    /// Items are being executed
    Running,
    /// Every item executed successfully
    Done,
    /// An item failed; remaining items were not executed
    Failed,
}

impl BatchStatus {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `self -> next` is a legal forward transition
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running) | (Self::Running, Self::Done) | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Overall status of an ingestion, derived from its batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionState {
    Pending,
    Running,
    Done,
    Failed,
}

impl std::fmt::Display for IngestionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Derive an ingestion's overall status from its batches' statuses
///
/// All pending is `pending`. All terminal is `done`, or `failed` if any batch
/// failed. Any other mix is `running`. Zero batches is vacuously `done`.
pub fn derive_status<I>(statuses: I) -> IngestionState
where
    I: IntoIterator<Item = BatchStatus>,
{
    let mut all_pending = true;
    let mut all_terminal = true;
    let mut any_failed = false;

    for status in statuses {
        all_pending &= status == BatchStatus::Pending;
        all_terminal &= status.is_terminal();
        any_failed |= status == BatchStatus::Failed;
    }

    if all_terminal {
        if any_failed {
            IngestionState::Failed
        } else {
            IngestionState::Done
        }
    } else if all_pending {
        IngestionState::Pending
    } else {
        IngestionState::Running
    }
}

/// One chunk of an ingestion's ids, scheduled and executed as a unit
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: BatchId,
    pub ingestion_id: IngestionId,
    pub items: Vec<u64>,
    pub status: BatchStatus,
    pub priority: Priority,
    /// Submission sequence number of the owning ingestion
    pub seq: u64,
    /// Position of this batch within its ingestion
    pub position: usize,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

/// One submission's aggregate of batches
#[derive(Debug, Clone)]
pub struct Ingestion {
    pub id: IngestionId,
    /// Batch ids in split order
    pub batch_ids: Vec<BatchId>,
    /// Monotonic submission sequence number, used for tie-breaking
    pub seq: u64,
}

/// Status payload for one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchView {
    pub batch_id: BatchId,
    pub ids: Vec<u64>,
    pub status: BatchStatus,
}

/// Status payload for one ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStatus {
    pub ingestion_id: IngestionId,
    pub status: IngestionState,
    pub batches: Vec<BatchView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BatchStatus::*;

    #[test]
    fn test_forward_transitions_only() {
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Done));
        assert!(Running.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Done));
        assert!(!Done.can_transition_to(Running));
        assert!(!Done.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Done));
        assert!(!Running.can_transition_to(Running));
    }

    #[test]
    fn test_derive_status_empty_is_done() {
        assert_eq!(derive_status(Vec::<BatchStatus>::new()), IngestionState::Done);
    }

    #[test]
    fn test_derive_status_uniform() {
        assert_eq!(derive_status([Pending, Pending]), IngestionState::Pending);
        assert_eq!(derive_status([Done, Done, Done]), IngestionState::Done);
        assert_eq!(derive_status([Running]), IngestionState::Running);
    }

    #[test]
    fn test_derive_status_mixed_is_running() {
        assert_eq!(derive_status([Done, Pending]), IngestionState::Running);
        assert_eq!(derive_status([Done, Running, Pending]), IngestionState::Running);
        assert_eq!(derive_status([Pending, Running]), IngestionState::Running);
        assert_eq!(derive_status([Failed, Pending]), IngestionState::Running);
    }

    #[test]
    fn test_derive_status_failed_once_all_terminal() {
        assert_eq!(derive_status([Done, Failed]), IngestionState::Failed);
        assert_eq!(derive_status([Failed]), IngestionState::Failed);
    }

    #[test]
    fn test_status_view_wire_shape() {
        let view = IngestionStatus {
            ingestion_id: IngestionId::from("ing"),
            status: IngestionState::Running,
            batches: vec![BatchView {
                batch_id: BatchId::from("b1"),
                ids: vec![1, 2, 3],
                status: Running,
            }],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ingestion_id": "ing",
                "status": "running",
                "batches": [{"batch_id": "b1", "ids": [1, 2, 3], "status": "running"}]
            })
        );
    }
}

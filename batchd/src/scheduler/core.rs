//! Scheduler implementation
//!
//! A single drain loop pops the highest-priority pending batch, executes its
//! items one at a time, records the outcome and then waits out the cooldown
//! before popping again. Queue, records and the loop flag share one mutex;
//! the guard is never held across an await.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::domain::{Batch, BatchId, BatchStatus, IngestionId, IngestionStatus, Priority};
use crate::store::BatchStore;

use super::config::SchedulerConfig;
use super::executor::{ExecutorError, ItemExecutor, SimulatedExecutor};
use super::queue::{BatchQueue, QueueEntry, QueueState, SchedulerStats};

/// Internal state protected by mutex
struct SchedulerInner {
    /// Pending batches in pop order
    queue: BatchQueue,

    /// Ingestion and batch records
    store: BatchStore,

    /// Whether a drain loop is active
    draining: bool,

    /// Bumped by reset and shutdown; a loop from an older epoch stops
    epoch: u64,

    /// Set once by shutdown; no loop starts afterwards
    shut_down: bool,

    /// Earliest instant the next batch may start
    cooldown_until: Option<Instant>,

    /// Statistics
    stats: SchedulerStats,
}

struct Shared {
    config: SchedulerConfig,
    executor: Arc<dyn ItemExecutor>,
    inner: Mutex<SchedulerInner>,
    /// Wakes a sleeping loop on reset or shutdown
    cancel: Notify,
}

/// Priority-ordered, rate-limited batch scheduler
///
/// Cheap to clone; all clones share the same queue, records and loop.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a scheduler with the simulated executor
    pub fn new(config: SchedulerConfig) -> Self {
        let executor = Arc::new(SimulatedExecutor::new(config.item_latency()));
        Self::with_executor(config, executor)
    }

    /// Create a scheduler with a custom item executor
    pub fn with_executor(config: SchedulerConfig, executor: Arc<dyn ItemExecutor>) -> Self {
        debug!(?config, "Scheduler::with_executor: called");
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(SchedulerInner {
                    queue: BatchQueue::new(),
                    store: BatchStore::new(config.max_batch_size),
                    draining: false,
                    epoch: 0,
                    shut_down: false,
                    cooldown_until: None,
                    stats: SchedulerStats::default(),
                }),
                config,
                executor,
                cancel: Notify::new(),
            }),
        }
    }

    /// Scheduler configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        // Every critical section leaves the state consistent, so a poisoned lock is still usable
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Split `ids` into batches, record them, enqueue them and start the loop if idle
    ///
    /// Returns without waiting for any batch to run. Must be called from
    /// within a Tokio runtime.
    pub fn submit(&self, ids: &[u64], priority: Priority) -> IngestionId {
        debug!(count = ids.len(), ?priority, "Scheduler::submit: called");
        let mut inner = self.lock();

        let ingestion_id = inner.store.create_ingestion(ids, priority);
        let entries: Vec<QueueEntry> = inner
            .store
            .batches_of(&ingestion_id)
            .into_iter()
            .map(QueueEntry::from)
            .collect();
        let batch_count = entries.len();
        for entry in entries {
            inner.queue.enqueue(entry);
        }
        inner.stats.peak_queue_depth = inner.stats.peak_queue_depth.max(inner.queue.len());

        info!(%ingestion_id, ?priority, batch_count, queued = inner.queue.len(), "Ingestion submitted");

        let start = Self::claim_loop(&mut inner);
        drop(inner);

        if let Some(epoch) = start {
            self.spawn_loop(epoch);
        }
        ingestion_id
    }

    /// Start the drain loop if it is idle and there is work; no-op otherwise
    pub fn trigger(&self) {
        debug!("Scheduler::trigger: called");
        let start = Self::claim_loop(&mut self.lock());
        if let Some(epoch) = start {
            self.spawn_loop(epoch);
        }
    }

    /// Check-and-set the loop flag; returns the epoch to run under if claimed
    fn claim_loop(inner: &mut SchedulerInner) -> Option<u64> {
        if inner.draining || inner.shut_down || inner.queue.is_empty() {
            debug!(
                draining = inner.draining,
                shut_down = inner.shut_down,
                "Scheduler::claim_loop: not starting"
            );
            return None;
        }
        inner.draining = true;
        Some(inner.epoch)
    }

    fn spawn_loop(&self, epoch: u64) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.drain(epoch).await;
        });
    }

    /// Current status of an ingestion, or None if unknown
    pub fn ingestion_status(&self, id: &IngestionId) -> Option<IngestionStatus> {
        debug!(%id, "Scheduler::ingestion_status: called");
        self.lock().store.ingestion_status(id)
    }

    /// Start and finish instants of a batch
    pub fn batch_timing(&self, id: &BatchId) -> Option<(Option<Instant>, Option<Instant>)> {
        self.lock().store.batch(id).map(|b| (b.started_at, b.finished_at))
    }

    /// Get current queue state
    pub fn queue_state(&self) -> QueueState {
        let inner = self.lock();
        QueueState {
            queued: inner.queue.len(),
            draining: inner.draining,
            stats: inner.stats.clone(),
        }
    }

    /// Get the scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        self.lock().stats.clone()
    }

    /// Clear the queue and every record, force the loop idle and cancel any pending wait
    pub fn reset(&self) {
        debug!("Scheduler::reset: called");
        let mut inner = self.lock();
        inner.queue.clear();
        inner.store.clear();
        inner.draining = false;
        inner.cooldown_until = None;
        inner.stats = SchedulerStats::default();
        inner.epoch += 1;
        drop(inner);

        self.shared.cancel.notify_waiters();
        info!("Scheduler reset");
    }

    /// Stop the loop for good: pending cooldowns and in-flight items are abandoned
    ///
    /// A batch caught mid-execution is left `running`.
    pub fn shutdown(&self) {
        debug!("Scheduler::shutdown: called");
        let mut inner = self.lock();
        inner.shut_down = true;
        inner.draining = false;
        inner.epoch += 1;
        let queued = inner.queue.len();
        drop(inner);

        self.shared.cancel.notify_waiters();
        info!(queued, "Scheduler shut down");
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    /// Sleep for `duration` unless reset or shutdown intervenes; false if cancelled
    async fn pause(&self, epoch: u64, duration: Duration) -> bool {
        let cancelled = self.shared.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();

        if !self.is_current(epoch) {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_current(epoch),
            _ = &mut cancelled => false,
        }
    }

    /// Execute one item; None if reset or shutdown cancelled it
    ///
    /// A panicking executor is reported as an item failure so the loop keeps draining.
    async fn run_item(&self, epoch: u64, item_id: u64) -> Option<Result<(), ExecutorError>> {
        let cancelled = self.shared.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();

        if !self.is_current(epoch) {
            return None;
        }

        let work = AssertUnwindSafe(self.shared.executor.execute(item_id)).catch_unwind();
        tokio::select! {
            result = work => Some(result.unwrap_or_else(|payload| {
                Err(ExecutorError::Panicked {
                    item_id,
                    message: panic_message(payload.as_ref()),
                })
            })),
            _ = &mut cancelled => None,
        }
    }

    /// Pop entries until one can be marked running; clears the loop flag when the queue is empty
    fn start_next(inner: &mut SchedulerInner) -> Option<Batch> {
        while let Some(entry) = inner.queue.pop_highest() {
            match inner.store.set_batch_status(&entry.batch_id, BatchStatus::Running) {
                Ok(()) => {
                    if let Some(batch) = inner.store.batch(&entry.batch_id) {
                        return Some(batch.clone());
                    }
                }
                Err(e) => {
                    warn!(batch_id = %entry.batch_id, error = %e, "Skipping inconsistent queue entry");
                    inner.stats.batches_skipped += 1;
                }
            }
        }
        inner.draining = false;
        None
    }

    /// The drain loop body; runs until the queue is empty or its epoch is superseded
    async fn drain(self, epoch: u64) {
        debug!(epoch, "Scheduler::drain: called");

        // Honor spacing left over from the previous drain
        let leftover = self
            .lock()
            .cooldown_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .filter(|d| !d.is_zero());
        if let Some(wait) = leftover {
            debug!(wait_ms = wait.as_millis() as u64, "Scheduler::drain: waiting out previous cooldown");
            if !self.pause(epoch, wait).await {
                debug!(epoch, "Scheduler::drain: cancelled during leftover cooldown");
                return;
            }
        }

        loop {
            let next = {
                let mut inner = self.lock();
                if inner.epoch != epoch {
                    return;
                }
                Self::start_next(&mut inner)
            };

            let Some(batch) = next else {
                info!("Queue drained, scheduler idle");
                return;
            };
            let batch_id = batch.id;
            let items = batch.items;

            info!(
                %batch_id,
                ingestion_id = %batch.ingestion_id,
                priority = %batch.priority,
                items = items.len(),
                "Batch running"
            );

            let mut outcome = Ok(());
            for item_id in &items {
                match self.run_item(epoch, *item_id).await {
                    Some(Ok(())) => {
                        let mut inner = self.lock();
                        if inner.epoch == epoch {
                            inner.stats.items_executed += 1;
                        }
                    }
                    Some(Err(e)) => {
                        outcome = Err(e);
                        break;
                    }
                    None => {
                        info!(%batch_id, item_id, "Batch abandoned mid-execution");
                        return;
                    }
                }
            }

            let has_more = {
                let mut inner = self.lock();
                if inner.epoch != epoch {
                    return;
                }

                let status = match &outcome {
                    Ok(()) => {
                        inner.stats.batches_completed += 1;
                        BatchStatus::Done
                    }
                    Err(e) => {
                        error!(%batch_id, error = %e, "Batch failed");
                        inner.stats.batches_failed += 1;
                        BatchStatus::Failed
                    }
                };
                if let Err(e) = inner.store.set_batch_status(&batch_id, status) {
                    warn!(%batch_id, error = %e, "Failed to record batch outcome");
                }
                inner.cooldown_until = Some(Instant::now() + self.shared.config.cooldown());

                let has_more = !inner.queue.is_empty();
                if !has_more {
                    inner.draining = false;
                }
                has_more
            };

            let label = if outcome.is_ok() { "done" } else { "failed" };
            info!(%batch_id, status = label, "Batch finished");

            if !has_more {
                info!("Queue drained, scheduler idle");
                return;
            }

            if !self.pause(epoch, self.shared.config.cooldown()).await {
                debug!(epoch, "Scheduler::drain: cancelled during cooldown");
                return;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Progress events emitted by `Dispatcher::run_with_events`.

use crate::domain::{BatchId, BatchSummary, TaskOutcome};

#[derive(Debug, Clone)]
pub enum DispatchEvent<R> {
    /// Emitted once, before any task starts.
    BatchStarted {
        batch_id: BatchId,
        total: usize,
        concurrency: usize,
    },
    /// A task acquired a concurrency slot and its worker was invoked.
    TaskStarted { index: usize },
    /// A task reported. Arrives in completion order, not submission order.
    ///
    /// Tasks cut off by cancellation or the batch deadline also get one,
    /// carrying their `Cancelled` failure, before `BatchFinished`.
    TaskFinished(TaskOutcome<R>),
    /// Emitted once, after the ordered outcome set has been assembled.
    BatchFinished {
        batch_id: BatchId,
        summary: BatchSummary,
    },
}

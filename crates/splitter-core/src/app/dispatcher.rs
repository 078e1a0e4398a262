//! Dispatcher - fan-out/fan-in execution of one batch
//!
//! # フロー
//! 1. 設定と descriptor の index を検証（ここで失敗したらタスクは 1 つも起動しない）
//! 2. descriptor ごとに tokio タスクを spawn し、Semaphore で同時実行数を制限
//! 3. 各タスクは自分の slot に結果を書く（完了順は問わない）
//! 4. 全タスクの完了、キャンセル、またはバッチの期限で待機を終了
//! 5. slot を index 順に読み出して返す（未完了の slot は Cancelled）

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::capabilities::CapabilitySet;
use super::collector::ResultCollector;
use super::config::DispatchConfig;
use super::events::DispatchEvent;
use crate::domain::{
    BatchId, BatchSummary, DispatchError, FailureKind, OutcomeRecord, TaskDescriptor, TaskFailure,
    TaskOutcome,
};
use crate::ports::{IdGenerator, SystemClock, TaskContext, UlidGenerator, Worker};

/// Everything one `run` produced.
#[derive(Debug, Clone)]
pub struct BatchReport<R> {
    pub batch_id: BatchId,
    /// Ordered by source index; `outcomes[i].source_index() == i`.
    pub outcomes: Vec<TaskOutcome<R>>,
    pub summary: BatchSummary,
}

impl<R: Serialize> BatchReport<R> {
    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.outcomes.iter().map(TaskOutcome::to_record).collect()
    }
}

/// Runs batches of independent tasks with bounded concurrency.
///
/// A `Dispatcher` holds configuration only. Each `run*` call builds its own
/// batch state, so one dispatcher can serve concurrent calls.
pub struct Dispatcher {
    config: DispatchConfig,
    capabilities: Arc<CapabilitySet>,
    ids: Arc<dyn IdGenerator>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        config.validate()?;
        Ok(Self {
            config,
            capabilities: Arc::new(CapabilitySet::empty()),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        })
    }

    pub fn with_capabilities(mut self, capabilities: Arc<CapabilitySet>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run every descriptor and return one outcome per descriptor, in
    /// submission order.
    pub async fn run<P, W>(
        &self,
        descriptors: Vec<TaskDescriptor<P>>,
        worker: Arc<W>,
    ) -> Result<Vec<TaskOutcome<W::Output>>, DispatchError>
    where
        P: Send + Sync + 'static,
        W: Worker<P> + 'static,
    {
        let report = self
            .run_until(descriptors, worker, CancellationToken::new())
            .await?;
        Ok(report.outcomes)
    }

    /// Like `run`, but stops waiting once `cancel` fires. Tasks that have
    /// not reported by then come back as `FailureKind::Cancelled`.
    pub async fn run_until<P, W>(
        &self,
        descriptors: Vec<TaskDescriptor<P>>,
        worker: Arc<W>,
        cancel: CancellationToken,
    ) -> Result<BatchReport<W::Output>, DispatchError>
    where
        P: Send + Sync + 'static,
        W: Worker<P> + 'static,
    {
        self.execute(descriptors, worker, cancel, Arc::new(Silent))
            .await
    }

    /// Like `run_until`, additionally emitting a `DispatchEvent` for every
    /// start and finish. The returned report is still in submission order.
    pub async fn run_with_events<P, W>(
        &self,
        descriptors: Vec<TaskDescriptor<P>>,
        worker: Arc<W>,
        cancel: CancellationToken,
        events: mpsc::UnboundedSender<DispatchEvent<W::Output>>,
    ) -> Result<BatchReport<W::Output>, DispatchError>
    where
        P: Send + Sync + 'static,
        W: Worker<P> + 'static,
        W::Output: Clone + Sync,
    {
        self.execute(descriptors, worker, cancel, Arc::new(Channel(events)))
            .await
    }

    async fn execute<P, W, O>(
        &self,
        descriptors: Vec<TaskDescriptor<P>>,
        worker: Arc<W>,
        cancel: CancellationToken,
        observer: Arc<O>,
    ) -> Result<BatchReport<W::Output>, DispatchError>
    where
        P: Send + Sync + 'static,
        W: Worker<P> + 'static,
        O: Observer<W::Output>,
    {
        check_indices(&descriptors)?;

        let batch_id = self.ids.generate_batch_id();
        let total = descriptors.len();
        let concurrency = self.config.concurrency.min(total);
        observer.batch_started(batch_id, total, concurrency);

        if total == 0 {
            debug!(%batch_id, "empty batch, nothing to dispatch");
            let summary = BatchSummary::default();
            observer.batch_finished(batch_id, summary);
            return Ok(BatchReport {
                batch_id,
                outcomes: Vec::new(),
                summary,
            });
        }

        let span = info_span!("batch", %batch_id, total, concurrency);
        let outcomes = self
            .fan_out(batch_id, descriptors, worker, cancel, concurrency, &observer)
            .instrument(span)
            .await;

        let summary = BatchSummary::from_outcomes(&outcomes);
        observer.batch_finished(batch_id, summary);
        Ok(BatchReport {
            batch_id,
            outcomes,
            summary,
        })
    }

    async fn fan_out<P, W, O>(
        &self,
        batch_id: BatchId,
        descriptors: Vec<TaskDescriptor<P>>,
        worker: Arc<W>,
        cancel: CancellationToken,
        concurrency: usize,
        observer: &Arc<O>,
    ) -> Vec<TaskOutcome<W::Output>>
    where
        P: Send + Sync + 'static,
        W: Worker<P> + 'static,
        O: Observer<W::Output>,
    {
        let started = Instant::now();
        let collector = Arc::new(ResultCollector::new(descriptors.len()));
        let semaphore = Arc::new(Semaphore::new(concurrency));
        // 期限切れで止めても呼び出し元の token には波及させない
        let stop_token = cancel.child_token();
        // worker に渡す token は slot を閉じた後でだけ cancel する。
        // 先に閉じておけば、キャンセルに反応して返ってきた結果が混ざらない。
        let worker_token = CancellationToken::new();
        let task_timeout = self.config.task_timeout_duration();

        let mut join_set = JoinSet::new();
        for descriptor in descriptors {
            let ctx = TaskContext::new(
                batch_id,
                descriptor.index(),
                worker_token.child_token(),
                Arc::clone(&self.capabilities),
            );
            let unit = TaskUnit {
                descriptor,
                ctx,
                worker: Arc::clone(&worker),
                stop: stop_token.clone(),
                semaphore: Arc::clone(&semaphore),
                collector: Arc::clone(&collector),
                observer: Arc::clone(observer),
                timeout: task_timeout,
            };
            join_set.spawn(unit.run().in_current_span());
        }

        let stop = wait_all(
            &mut join_set,
            &stop_token,
            self.config.batch_timeout_duration(),
        )
        .await;

        // 未完了の slot にも TaskFinished を流す
        let outcomes = collector.finish_with(
            |index| match stop {
                Some(reason) => TaskFailure::cancelled(format!(
                    "{}: task {index} did not finish",
                    reason.as_str()
                )),
                None => TaskFailure::new(FailureKind::Panicked, "task aborted before reporting"),
            },
            |o| observer.task_finished(o),
        );

        if let Some(reason) = stop {
            // 実行中の worker は強制停止しない。token で協調的に止まるのを期待し、
            // 結果はもう待たない。
            stop_token.cancel();
            worker_token.cancel();
            join_set.detach_all();
            info!(
                reason = reason.as_str(),
                "batch stopped before all tasks reported"
            );
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        outcomes
    }
}

/// Run `descriptors` through `worker` with at most `concurrency` tasks in
/// flight.
///
/// Errors only if the configuration is invalid (`concurrency == 0`) or the
/// descriptor indices are not `0..n`; every task failure is reported inside
/// the returned outcomes.
pub async fn dispatch<P, W>(
    descriptors: Vec<TaskDescriptor<P>>,
    worker: Arc<W>,
    concurrency: usize,
) -> Result<Vec<TaskOutcome<W::Output>>, DispatchError>
where
    P: Send + Sync + 'static,
    W: Worker<P> + 'static,
{
    Dispatcher::new(DispatchConfig::with_concurrency(concurrency))?
        .run(descriptors, worker)
        .await
}

fn check_indices<P>(descriptors: &[TaskDescriptor<P>]) -> Result<(), DispatchError> {
    match descriptors
        .iter()
        .enumerate()
        .find(|(position, d)| d.index() != *position)
    {
        Some((position, d)) => Err(DispatchError::IndexMismatch {
            position,
            index: d.index(),
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Cancelled,
    DeadlineExceeded,
}

impl StopReason {
    fn as_str(self) -> &'static str {
        match self {
            StopReason::Cancelled => "cancelled",
            StopReason::DeadlineExceeded => "batch deadline exceeded",
        }
    }
}

/// Wait until every task has joined. Returns why waiting stopped early, if
/// it did.
async fn wait_all(
    join_set: &mut JoinSet<()>,
    cancel: &CancellationToken,
    deadline: Option<Duration>,
) -> Option<StopReason> {
    let deadline = async {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Some(StopReason::Cancelled),
            _ = &mut deadline => return Some(StopReason::DeadlineExceeded),
            joined = join_set.join_next() => match joined {
                None => return None,
                Some(Ok(())) => {}
                // TaskUnit::run catches worker panics itself, so this is an abort.
                Some(Err(e)) => warn!(error = %e, "task join failed"),
            },
        }
    }
}

/// One spawned execution: a descriptor plus everything needed to run it and
/// report back.
struct TaskUnit<P, W: Worker<P>, O>
where
    P: Send + Sync,
{
    descriptor: TaskDescriptor<P>,
    ctx: TaskContext,
    worker: Arc<W>,
    /// Batch-level stop signal; only used while waiting for a permit.
    stop: CancellationToken,
    semaphore: Arc<Semaphore>,
    collector: Arc<ResultCollector<W::Output>>,
    observer: Arc<O>,
    timeout: Option<Duration>,
}

impl<P, W, O> TaskUnit<P, W, O>
where
    P: Send + Sync + 'static,
    W: Worker<P> + 'static,
    O: Observer<W::Output>,
{
    async fn run(self) {
        let index = self.descriptor.index();
        let label = self.descriptor.label();

        // 空き待ちの間に止められたら worker を呼ばずに終わる
        let _permit = tokio::select! {
            biased;
            _ = self.stop.cancelled() => return,
            permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };

        self.observer.task_started(index);
        debug!(index, %label, "task started");
        let started = Instant::now();

        let call =
            AssertUnwindSafe(self.worker.execute(&self.descriptor, self.ctx)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(caught) => into_outcome(index, caught),
                Err(_) => TaskOutcome::failed(
                    index,
                    TaskFailure::new(
                        FailureKind::TimedOut,
                        format!("timed out after {}ms", limit.as_millis()),
                    ),
                ),
            },
            None => into_outcome(index, call.await),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome.failure() {
            None => debug!(index, %label, elapsed_ms, "task succeeded"),
            Some(failure) => warn!(
                index,
                %label,
                elapsed_ms,
                kind = ?failure.kind,
                error = %failure.message,
                "task failed"
            ),
        }

        let observer = &self.observer;
        if !self
            .collector
            .record_with(outcome, |o| observer.task_finished(o))
        {
            debug!(index, %label, "outcome arrived after the batch was closed");
        }
    }
}

fn into_outcome<R, E: std::fmt::Display>(
    index: usize,
    caught: Result<Result<R, E>, Box<dyn Any + Send>>,
) -> TaskOutcome<R> {
    match caught {
        Ok(Ok(value)) => TaskOutcome::success(index, value),
        Ok(Err(err)) => TaskOutcome::failed(index, TaskFailure::error(err.to_string())),
        Err(panic) => TaskOutcome::failed(
            index,
            TaskFailure::new(
                FailureKind::Panicked,
                format!("worker panicked: {}", panic_message(panic.as_ref())),
            ),
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Hooks for progress reporting. `Silent` for plain runs, `Channel` for
/// `run_with_events`.
trait Observer<R>: Send + Sync + 'static {
    fn batch_started(&self, _batch_id: BatchId, _total: usize, _concurrency: usize) {}
    fn task_started(&self, _index: usize) {}
    fn task_finished(&self, _outcome: &TaskOutcome<R>) {}
    fn batch_finished(&self, _batch_id: BatchId, _summary: BatchSummary) {}
}

struct Silent;

impl<R> Observer<R> for Silent {}

struct Channel<R>(mpsc::UnboundedSender<DispatchEvent<R>>);

impl<R: Clone + Send + Sync + 'static> Observer<R> for Channel<R> {
    // 受信側が drop されていても実行は続ける
    fn batch_started(&self, batch_id: BatchId, total: usize, concurrency: usize) {
        let _ = self.0.send(DispatchEvent::BatchStarted {
            batch_id,
            total,
            concurrency,
        });
    }

    fn task_started(&self, index: usize) {
        let _ = self.0.send(DispatchEvent::TaskStarted { index });
    }

    fn task_finished(&self, outcome: &TaskOutcome<R>) {
        let _ = self.0.send(DispatchEvent::TaskFinished(outcome.clone()));
    }

    fn batch_finished(&self, batch_id: BatchId, summary: BatchSummary) {
        let _ = self.0.send(DispatchEvent::BatchFinished { batch_id, summary });
    }
}

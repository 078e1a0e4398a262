//! Worker port - caller-supplied task execution
//!
//! The dispatcher knows nothing about what a worker does. It hands each
//! descriptor to `Worker::execute` together with a fresh `TaskContext` and
//! records whatever comes back (or the panic, if one escapes).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::capabilities::CapabilitySet;
use crate::domain::{BatchId, Label, TaskDescriptor};

/// Worker は 1 つの TaskDescriptor を実行する
///
/// 同じインスタンスが複数タスクから同時に呼ばれるので、`&self` で
/// 再入可能でなければならない。タスク間で状態を共有しないこと。
#[async_trait]
pub trait Worker<P: Send + Sync>: Send + Sync {
    type Output: Send + 'static;
    type Error: fmt::Display + Send + 'static;

    async fn execute(
        &self,
        task: &TaskDescriptor<P>,
        ctx: TaskContext,
    ) -> Result<Self::Output, Self::Error>;
}

/// Per-invocation context: created for one task, used once, then dropped.
#[derive(Debug, Clone)]
pub struct TaskContext {
    batch_id: BatchId,
    index: usize,
    cancellation: CancellationToken,
    capabilities: Arc<CapabilitySet>,
}

impl TaskContext {
    pub fn new(
        batch_id: BatchId,
        index: usize,
        cancellation: CancellationToken,
        capabilities: Arc<CapabilitySet>,
    ) -> Self {
        Self {
            batch_id,
            index,
            cancellation,
            capabilities,
        }
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> Label {
        Label::for_index(self.index)
    }

    /// Cancelled when the batch is cancelled or hits its deadline.
    /// Long-running workers should select on `cancellation().cancelled()`.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }
}

/// Adapter turning an async closure into a `Worker`.
///
/// The closure receives its own clone of the descriptor.
pub struct FnWorker<F> {
    f: F,
}

pub fn worker_fn<P, F, Fut>(f: F) -> FnWorker<F>
where
    F: Fn(TaskDescriptor<P>, TaskContext) -> Fut + Send + Sync,
    Fut: Future + Send,
{
    FnWorker { f }
}

#[async_trait]
impl<P, F, Fut, O, E> Worker<P> for FnWorker<F>
where
    P: Clone + Send + Sync + 'static,
    F: Fn(TaskDescriptor<P>, TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, E>> + Send,
    O: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    type Output = O;
    type Error = E;

    async fn execute(&self, task: &TaskDescriptor<P>, ctx: TaskContext) -> Result<O, E> {
        (self.f)(task.clone(), ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::capabilities::CapabilitySet;
    use ulid::Ulid;

    fn ctx(index: usize) -> TaskContext {
        TaskContext::new(
            BatchId::from_ulid(Ulid::new()),
            index,
            CancellationToken::new(),
            Arc::new(CapabilitySet::empty()),
        )
    }

    #[tokio::test]
    async fn fn_worker_passes_descriptor_and_context() {
        let worker = worker_fn(|task: TaskDescriptor<String>, ctx: TaskContext| async move {
            Ok::<_, String>(format!("{}:{}", ctx.label(), task.payload()))
        });

        let task = TaskDescriptor::new(4, "lint".to_string());
        let out = worker.execute(&task, ctx(4)).await.unwrap();
        assert_eq!(out, "T5:lint");
    }

    #[tokio::test]
    async fn context_reflects_cancellation() {
        let c = ctx(0);
        assert!(!c.is_cancelled());
        c.cancellation().cancel();
        assert!(c.is_cancelled());
    }
}

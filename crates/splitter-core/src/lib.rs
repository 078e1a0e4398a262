//! splitter-core
//!
//! Fan-out/fan-in dispatcher: runs a batch of independent tasks with bounded
//! concurrency and returns exactly one outcome per task, in submission order.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, descriptor, outcome, errors）
//! - **ports**: 抽象化レイヤー（Worker, TaskSource, ModelBackend, Capability, Clock, IdGenerator）
//! - **app**: Dispatcher, ResultCollector, DispatchConfig, CapabilitySet, DispatchEvent
//! - **impls**: 実装（catalog/backlog/list source, ModelWorker, EchoBackend, CodeStats）
//!
//! ```ignore
//! let worker = Arc::new(worker_fn(|task: TaskDescriptor<String>, _ctx: TaskContext| async move {
//!     Ok::<_, String>(format!("{}-done", task.payload()))
//! }));
//! let outcomes = dispatch(TaskDescriptor::batch(tasks), worker, 4).await?;
//! for o in &outcomes {
//!     println!("{} {:?}", o.label(), o.status());
//! }
//! ```

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{BatchReport, DispatchConfig, DispatchEvent, Dispatcher, dispatch};
pub use domain::{
    BatchSummary, DispatchError, FailureKind, Label, OutcomeStatus, TaskDescriptor, TaskFailure,
    TaskOutcome,
};
pub use ports::{TaskContext, Worker, worker_fn};

//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **CatalogSource**: TaskKind ごとの定型タスク（不足時は切り詰め）
//! - **BacklogSource**: todo backlog（不足時は空タスクで埋める）
//! - **ListSource**: ユーザー入力のタスク列
//! - **ModelWorker** / **EchoBackend**: ModelBackend を呼ぶ worker とオフライン backend
//! - **CodeStats**: `code_stats` capability

pub mod backlog;
pub mod catalog;
pub mod code_stats;
pub mod list;
pub mod model_worker;

pub use self::backlog::{Backlog, BacklogError, BacklogSource, EMPTY_TASK, TodoItem};
pub use self::catalog::{CatalogSource, TaskKind};
pub use self::code_stats::CodeStats;
pub use self::list::ListSource;
pub use self::model_worker::{EchoBackend, ModelWorker, ModelWorkerError};

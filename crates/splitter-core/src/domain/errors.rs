//! Errors - dispatcher-level error types
//!
//! Task failures never show up here: they are captured into `TaskOutcome`.
//! Only orchestration errors escape `run()`.

use thiserror::Error;

/// DispatchError はバッチを開始する前に検出される設定エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    #[error("{0} timeout must be greater than zero")]
    InvalidTimeout(&'static str),

    #[error("descriptor at position {position} has index {index}; indices must be 0..n in order")]
    IndexMismatch { position: usize, index: usize },
}

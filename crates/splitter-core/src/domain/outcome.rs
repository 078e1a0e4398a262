//! Outcome model: the per-task result record produced by the dispatcher.
//!
//! Every submitted descriptor yields exactly one `TaskOutcome`, tagged with
//! the descriptor's submission index and label.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::descriptor::Label;

/// Success or failure of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// Why a task did not succeed.
///
/// `Cancelled` is kept apart from the others so callers can resubmit
/// cancelled tasks without re-running ones that genuinely failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The worker returned an error.
    Error,
    /// The worker panicked.
    Panicked,
    /// The worker exceeded the per-task timeout.
    TimedOut,
    /// The batch was cancelled (or hit its deadline) before the task reported.
    Cancelled,
}

/// Failure detail carried by a `Failure` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Error, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Cancelled, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

/// The result of one task, identified by its submission index.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome<R> {
    source_index: usize,
    label: Label,
    result: Result<R, TaskFailure>,
}

impl<R> TaskOutcome<R> {
    pub fn success(source_index: usize, value: R) -> Self {
        Self {
            source_index,
            label: Label::for_index(source_index),
            result: Ok(value),
        }
    }

    pub fn failed(source_index: usize, failure: TaskFailure) -> Self {
        Self {
            source_index,
            label: Label::for_index(source_index),
            result: Err(failure),
        }
    }

    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn status(&self) -> OutcomeStatus {
        match self.result {
            Ok(_) => OutcomeStatus::Success,
            Err(_) => OutcomeStatus::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The success payload, present iff the status is `Success`.
    pub fn value(&self) -> Option<&R> {
        self.result.as_ref().ok()
    }

    /// The failure detail, present iff the status is `Failure`.
    pub fn failure(&self) -> Option<&TaskFailure> {
        self.result.as_ref().err()
    }

    pub fn result(&self) -> &Result<R, TaskFailure> {
        &self.result
    }

    pub fn into_result(self) -> Result<R, TaskFailure> {
        self.result
    }
}

impl<R: Serialize> TaskOutcome<R> {
    /// Flatten into the record shape written to result files.
    ///
    /// A success whose value cannot be serialized is written as an `ERROR`
    /// record rather than as a success with no result.
    pub fn to_record(&self) -> OutcomeRecord {
        let task_id = self.label.to_string();
        match &self.result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(result) => OutcomeRecord {
                    task_id,
                    status: "success".to_string(),
                    result: Some(result),
                    error: None,
                    kind: None,
                },
                Err(e) => OutcomeRecord::error(
                    task_id,
                    &TaskFailure::error(format!("result not serializable: {e}")),
                ),
            },
            Err(failure) => OutcomeRecord::error(task_id, failure),
        }
    }
}

/// Serialized form of an outcome, e.g.
/// `{"task_id":"T2","status":"error","error":"boom","kind":"ERROR"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub task_id: String,
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

impl OutcomeRecord {
    fn error(task_id: String, failure: &TaskFailure) -> Self {
        Self {
            task_id,
            status: "error".to_string(),
            result: None,
            error: Some(failure.message.clone()),
            kind: Some(failure.kind),
        }
    }
}

/// Counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn from_outcomes<R>(outcomes: &[TaskOutcome<R>]) -> Self {
        outcomes.iter().fold(
            Self {
                total: outcomes.len(),
                ..Self::default()
            },
            |mut acc, outcome| {
                match outcome.failure() {
                    None => acc.succeeded += 1,
                    Some(f) if f.is_cancelled() => acc.cancelled += 1,
                    Some(_) => acc.failed += 1,
                }
                acc
            },
        )
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

//! Domain model (ids, descriptors, outcomes, errors).

pub mod descriptor;
pub mod errors;
pub mod ids;
pub mod outcome;

pub use descriptor::{Label, TaskDescriptor};
pub use errors::DispatchError;
pub use ids::{BatchId, Id, IdMarker, IdParseError};
pub use outcome::{
    BatchSummary, FailureKind, OutcomeRecord, OutcomeStatus, TaskFailure, TaskOutcome,
};

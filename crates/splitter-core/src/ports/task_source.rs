//! TaskSource port - where descriptor batches come from
//!
//! Sources may return fewer than `count` descriptors. Whether a shortfall is
//! truncated or padded is decided by each source's `ShortfallPolicy`, never
//! by the dispatcher.

use thiserror::Error;

use crate::domain::TaskDescriptor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("unsupported task type: {0}")]
    UnknownTaskType(String),

    #[error("unknown project: {0}")]
    UnknownProject(String),
}

/// Extra input a source may use when generating tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceContext {
    pub project: Option<String>,
}

impl SourceContext {
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
        }
    }
}

/// What to do when a source has fewer tasks than were requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortfallPolicy {
    /// Return only what is available.
    Truncate,
    /// Fill up to `count` with copies of the placeholder text.
    Pad(String),
}

impl ShortfallPolicy {
    pub fn apply(&self, mut tasks: Vec<String>, count: usize) -> Vec<String> {
        tasks.truncate(count);
        if let ShortfallPolicy::Pad(placeholder) = self
            && tasks.len() < count
        {
            tracing::warn!(
                available = tasks.len(),
                requested = count,
                "task source short, padding with placeholder tasks"
            );
            tasks.resize(count, placeholder.clone());
        }
        tasks
    }
}

pub trait TaskSource {
    fn next_batch(
        &self,
        count: usize,
        ctx: &SourceContext,
    ) -> Result<Vec<TaskDescriptor<String>>, SourceError>;
}

//! ListSource - ユーザーが直接渡したタスク列

use crate::domain::TaskDescriptor;
use crate::ports::{ShortfallPolicy, SourceContext, SourceError, TaskSource};

/// Task source over a fixed list typed in by the user. Never pads.
#[derive(Debug, Clone, Default)]
pub struct ListSource {
    tasks: Vec<String>,
}

impl ListSource {
    pub fn new(tasks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tasks: tasks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl TaskSource for ListSource {
    fn next_batch(
        &self,
        count: usize,
        _ctx: &SourceContext,
    ) -> Result<Vec<TaskDescriptor<String>>, SourceError> {
        let tasks = ShortfallPolicy::Truncate.apply(self.tasks.clone(), count);
        Ok(TaskDescriptor::batch(tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_at_most_count_in_order() {
        let source = ListSource::new(["x", "y", "z"]);
        let batch = source.next_batch(2, &SourceContext::default()).unwrap();
        assert_eq!(batch, TaskDescriptor::batch(vec!["x".to_string(), "y".to_string()]));

        let batch = source.next_batch(10, &SourceContext::default()).unwrap();
        assert_eq!(batch.len(), 3);
    }
}

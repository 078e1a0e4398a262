//! Todo backlog and the task source built on it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{TaskDescriptor, TaskOutcome};
use crate::ports::{ShortfallPolicy, SourceContext, SourceError, TaskSource};

/// Placeholder used when the backlog has fewer open items than requested.
pub const EMPTY_TASK: &str = "empty task";

#[derive(Debug, Error)]
pub enum BacklogError {
    #[error("failed to access backlog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backlog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl TodoItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

/// An ordered todo list, stored as a JSON array of `TodoItem`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Backlog {
    items: Vec<TodoItem>,
}

impl Backlog {
    pub fn new(items: Vec<TodoItem>) -> Self {
        Self { items }
    }

    /// A missing file is an empty backlog.
    pub fn load(path: &Path) -> Result<Self, BacklogError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| BacklogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), BacklogError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(|source| BacklogError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn add(&mut self, text: impl Into<String>) {
        self.items.push(TodoItem::new(text));
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn pending(&self) -> impl Iterator<Item = &TodoItem> {
        self.items.iter().filter(|item| !item.done)
    }

    /// Mark the item at `position` (0-based) done.
    pub fn mark_done(&mut self, position: usize) -> bool {
        match self.items.get_mut(position) {
            Some(item) => {
                item.done = true;
                true
            }
            None => false,
        }
    }

    /// Settle a batch taken by `BacklogSource` from this backlog.
    ///
    /// Outcome `i` belongs to the `i`-th open item. Items whose outcome was
    /// cancelled stay open so the next batch picks them up again. Padding
    /// slots have no item and are skipped. Returns how many were marked.
    pub fn mark_settled<R>(&mut self, outcomes: &[TaskOutcome<R>]) -> usize {
        let open: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.done)
            .map(|(position, _)| position)
            .collect();

        let mut marked = 0;
        for outcome in outcomes {
            if outcome.failure().is_some_and(|f| f.is_cancelled()) {
                continue;
            }
            if let Some(&position) = open.get(outcome.source_index()) {
                self.items[position].done = true;
                marked += 1;
            }
        }
        marked
    }
}

/// Task source reading the open items of a `Backlog`, oldest first.
///
/// Default shortfall policy is `Pad(EMPTY_TASK)`, so a batch always has the
/// requested size.
#[derive(Debug, Clone)]
pub struct BacklogSource<'a> {
    backlog: &'a Backlog,
    policy: ShortfallPolicy,
}

impl<'a> BacklogSource<'a> {
    pub fn new(backlog: &'a Backlog) -> Self {
        Self {
            backlog,
            policy: ShortfallPolicy::Pad(EMPTY_TASK.to_string()),
        }
    }

    pub fn with_policy(mut self, policy: ShortfallPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl TaskSource for BacklogSource<'_> {
    fn next_batch(
        &self,
        count: usize,
        _ctx: &SourceContext,
    ) -> Result<Vec<TaskDescriptor<String>>, SourceError> {
        let open: Vec<String> = self
            .backlog
            .pending()
            .take(count)
            .map(|item| item.text.clone())
            .collect();
        Ok(TaskDescriptor::batch(self.policy.apply(open, count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskFailure;

    fn backlog() -> Backlog {
        Backlog::new(vec![
            TodoItem::new("a"),
            TodoItem {
                text: "done already".into(),
                done: true,
            },
            TodoItem::new("b"),
        ])
    }

    #[test]
    fn source_skips_done_items_and_pads() {
        let backlog = backlog();
        let batch = BacklogSource::new(&backlog)
            .next_batch(4, &SourceContext::default())
            .unwrap();
        let payloads: Vec<&str> = batch.iter().map(|d| d.payload().as_str()).collect();
        assert_eq!(payloads, vec!["a", "b", EMPTY_TASK, EMPTY_TASK]);
    }

    #[test]
    fn source_can_truncate_instead() {
        let backlog = backlog();
        let batch = BacklogSource::new(&backlog)
            .with_policy(ShortfallPolicy::Truncate)
            .next_batch(4, &SourceContext::default())
            .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn settled_items_are_marked_done() {
        let mut backlog = backlog();
        let outcomes = vec![
            TaskOutcome::success(0, ()),
            TaskOutcome::failed(1, TaskFailure::error("boom")),
            // padding slot
            TaskOutcome::success(2, ()),
        ];
        assert_eq!(backlog.mark_settled(&outcomes), 2);
        assert_eq!(backlog.pending().count(), 0);
    }

    #[test]
    fn cancelled_items_stay_open() {
        let mut backlog = backlog();
        let outcomes = vec![
            TaskOutcome::failed(0, TaskFailure::cancelled("cancelled")),
            TaskOutcome::success(1, ()),
        ];
        assert_eq!(backlog.mark_settled(&outcomes), 1);

        let open: Vec<&str> = backlog.pending().map(|i| i.text.as_str()).collect();
        assert_eq!(open, vec!["a"]);
        assert!(backlog.items()[2].done);
    }

    #[test]
    fn save_and_load_preserve_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");

        let mut backlog = Backlog::default();
        backlog.add("write docs");
        assert!(backlog.mark_done(0));
        backlog.add("fix bug");
        backlog.save(&path).unwrap();

        let loaded = Backlog::load(&path).unwrap();
        assert_eq!(loaded, backlog);
    }

    #[test]
    fn missing_file_is_empty_backlog() {
        let loaded = Backlog::load(Path::new("/nonexistent/todos.json")).unwrap();
        assert!(loaded.items().is_empty());
    }

    #[test]
    fn todo_done_defaults_to_false() {
        let backlog: Backlog = serde_json::from_str(r#"[{"text":"x"}]"#).unwrap();
        assert_eq!(backlog.pending().count(), 1);
    }
}

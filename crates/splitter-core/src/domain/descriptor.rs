//! TaskDescriptor and Label: the submission-time identity of a task.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of work as handed to the dispatcher.
///
/// `index` is the 0-based position in the submitted batch. The payload is
/// opaque to the dispatcher and only ever read by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor<P> {
    index: usize,
    payload: P,
}

impl<P> TaskDescriptor<P> {
    pub fn new(index: usize, payload: P) -> Self {
        Self { index, payload }
    }

    /// Build a batch from payloads, assigning indices in iteration order.
    pub fn batch(payloads: impl IntoIterator<Item = P>) -> Vec<Self> {
        payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| Self::new(index, payload))
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> Label {
        Label::for_index(self.index)
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

/// Human-facing task label, `T1` for index 0.
///
/// Derived from the submission index only, so the same descriptor gets the
/// same label on every run no matter which task finishes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(usize);

impl Label {
    pub fn for_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0 + 1)
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "T1")]
    #[case(1, "T2")]
    #[case(9, "T10")]
    fn label_is_one_based(#[case] index: usize, #[case] expected: &str) {
        assert_eq!(Label::for_index(index).to_string(), expected);
    }

    #[test]
    fn batch_assigns_indices_in_order() {
        let batch = TaskDescriptor::batch(["a", "b", "c"]);
        let indices: Vec<usize> = batch.iter().map(TaskDescriptor::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(*batch[1].payload(), "b");
        assert_eq!(batch[2].label().to_string(), "T3");
    }

    #[test]
    fn label_serializes_as_string() {
        let s = serde_json::to_string(&Label::for_index(2)).unwrap();
        assert_eq!(s, "\"T3\"");
    }
}

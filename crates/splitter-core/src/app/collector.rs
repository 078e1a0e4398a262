//! ResultCollector - one pre-allocated slot per submission index
//!
//! Workers write into their own slot as they finish, in whatever order that
//! happens. `finish` reads the slots back in index order, so the returned
//! sequence never depends on completion timing.

use std::sync::{Mutex, PoisonError};

use crate::domain::{TaskFailure, TaskOutcome};

enum Slot<R> {
    Pending,
    Filled(TaskOutcome<R>),
    /// Drained by `finish`; late writes are dropped.
    Closed,
}

pub struct ResultCollector<R> {
    slots: Vec<Mutex<Slot<R>>>,
}

impl<R> ResultCollector<R> {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Mutex::new(Slot::Pending)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write an outcome into its slot.
    ///
    /// Returns `false` (and drops the outcome) if the slot was already
    /// written, already drained, or the index is out of range.
    pub fn record(&self, outcome: TaskOutcome<R>) -> bool {
        self.record_with(outcome, |_| {})
    }

    /// Like `record`, but runs `on_recorded` once the slot holds the outcome
    /// and before the slot lock is released. Anyone woken by `on_recorded`
    /// is therefore guaranteed to see the slot filled.
    pub fn record_with(
        &self,
        outcome: TaskOutcome<R>,
        on_recorded: impl FnOnce(&TaskOutcome<R>),
    ) -> bool {
        let Some(slot) = self.slots.get(outcome.source_index()) else {
            return false;
        };
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        match *slot {
            Slot::Pending => {
                on_recorded(&outcome);
                *slot = Slot::Filled(outcome);
                true
            }
            Slot::Filled(_) | Slot::Closed => false,
        }
    }

    pub fn is_recorded(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|slot| {
            matches!(
                *slot.lock().unwrap_or_else(PoisonError::into_inner),
                Slot::Filled(_)
            )
        })
    }

    pub fn recorded(&self) -> usize {
        (0..self.slots.len()).filter(|&i| self.is_recorded(i)).count()
    }

    /// Drain every slot in index order. Slots that never got an outcome are
    /// reported as failures built by `unfinished`.
    pub fn finish(&self, unfinished: impl Fn(usize) -> TaskFailure) -> Vec<TaskOutcome<R>> {
        self.finish_with(unfinished, |_| {})
    }

    /// Like `finish`, additionally calling `on_filled` for every outcome
    /// built by `unfinished`, while that slot is still locked.
    pub fn finish_with(
        &self,
        unfinished: impl Fn(usize) -> TaskFailure,
        mut on_filled: impl FnMut(&TaskOutcome<R>),
    ) -> Vec<TaskOutcome<R>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
                match std::mem::replace(&mut *slot, Slot::Closed) {
                    Slot::Filled(outcome) => outcome,
                    Slot::Pending | Slot::Closed => {
                        let outcome = TaskOutcome::failed(index, unfinished(index));
                        on_filled(&outcome);
                        outcome
                    }
                }
            })
            .collect()
    }
}

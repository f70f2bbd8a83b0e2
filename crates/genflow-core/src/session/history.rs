//! Edit history over the session's result timeline.
//!
//! The timeline is `[...result_history, current_result]`. After any of these
//! operations `result_history` contains no copy of `current_result`.

use super::model::{ResultRef, WorkflowSession};
use crate::error::{GenflowError, Result};

impl WorkflowSession {
    /// Pops the most recent history entry and makes it current.
    ///
    /// Returns the new current result, or `None` when the history is empty
    /// (nothing changes in that case).
    pub fn undo(&mut self) -> Option<ResultRef> {
        let previous = self.result_history.pop()?;
        self.current_result = Some(previous.clone());
        self.touch();
        Some(previous)
    }

    /// The combined timeline, oldest first.
    pub fn timeline(&self) -> Vec<ResultRef> {
        self.result_history
            .iter()
            .cloned()
            .chain(self.current_result.iter().cloned())
            .collect()
    }

    /// Makes `result` (found at `index` in the timeline) the current result.
    ///
    /// The selected entry is removed from wherever it sits; the remaining
    /// entries keep their relative order and become the history. When
    /// `index` does not point at `result` the entry is looked up by value.
    /// Selecting the entry that is already current is a no-op.
    pub fn select_history_entry(&mut self, result: &ResultRef, index: usize) -> Result<()> {
        if self.current_result.as_ref() == Some(result) {
            return Ok(());
        }

        let mut timeline = self.timeline();
        let position = if timeline.get(index) == Some(result) {
            index
        } else {
            timeline
                .iter()
                .position(|entry| entry == result)
                .ok_or_else(|| GenflowError::not_found("history entry", result.as_str()))?
        };

        let selected = timeline.remove(position);
        self.result_history = timeline;
        self.current_result = Some(selected);
        self.touch();
        Ok(())
    }
}

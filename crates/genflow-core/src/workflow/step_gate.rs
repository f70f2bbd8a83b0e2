//! Step gate: forward navigation limited to the unlocked frontier.

use crate::error::{GenflowError, Result};
use serde::{Deserialize, Serialize};

/// What a successful [`StepGate::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAdvance {
    /// Moved to the given step index.
    Moved(usize),
    /// The current step is the last one; the caller must submit.
    Submit,
}

/// State machine over an ordered list of steps.
///
/// Invariants held after every call:
/// - `current <= max_unlocked < step_count`
/// - `max_unlocked` never decreases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepGate {
    step_count: usize,
    current: usize,
    max_unlocked: usize,
}

impl StepGate {
    /// Creates a gate at step 0 with frontier 0.
    pub fn new(step_count: usize) -> Self {
        Self {
            step_count: step_count.max(1),
            current: 0,
            max_unlocked: 0,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn max_unlocked(&self) -> usize {
        self.max_unlocked
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn is_last(&self, step: usize) -> bool {
        step + 1 == self.step_count
    }

    /// Whether `step` may be left forward given its predicate result.
    pub fn can_advance(&self, step: usize, predicate_ok: bool) -> bool {
        predicate_ok && step < self.step_count
    }

    /// Advances from the current step.
    ///
    /// On the last step this does not move: it returns [`GateAdvance::Submit`].
    pub fn advance(&mut self, predicate_ok: bool) -> Result<GateAdvance> {
        if !self.can_advance(self.current, predicate_ok) {
            return Err(GenflowError::navigation(format!(
                "step {} is not complete",
                self.current
            )));
        }
        if self.is_last(self.current) {
            return Ok(GateAdvance::Submit);
        }
        let next = self.current + 1;
        self.current = next;
        self.max_unlocked = self.max_unlocked.max(next);
        Ok(GateAdvance::Moved(next))
    }

    /// Jumps to `target` if it is within the unlocked frontier.
    pub fn go_to(&mut self, target: usize) -> bool {
        if target > self.max_unlocked {
            return false;
        }
        self.current = target;
        true
    }

    /// Re-validates a gate restored from storage against the live step count.
    pub fn clamp_to(mut self, step_count: usize) -> Self {
        let step_count = step_count.max(1);
        self.step_count = step_count;
        self.max_unlocked = self.max_unlocked.min(step_count - 1);
        self.current = self.current.min(self.max_unlocked);
        self
    }
}

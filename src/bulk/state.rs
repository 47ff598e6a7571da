//! Per-invocation state machine.
//!
//! ```text
//! Idle -> Preflighting -> { NothingToDo | Aborted | Chunking }
//! Idle -> { NothingToDo | Chunking }
//! Chunking -> Running(0) -> Running(1) -> ... -> { Completed | HardStopped | Failed }
//! ```
//!
//! `NothingToDo`, `Aborted`, `Completed`, `HardStopped` and `Failed` are
//! terminal. A run never returns to `Running` once it reached one of them.

use crate::error::{BulkError, BulkResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkState {
    Idle,
    Preflighting,
    Chunking,
    Running(usize),
    NothingToDo,
    Aborted,
    Completed,
    HardStopped,
    Failed,
}

impl BulkState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BulkState::NothingToDo
                | BulkState::Aborted
                | BulkState::Completed
                | BulkState::HardStopped
                | BulkState::Failed
        )
    }

    pub fn can_transition_to(&self, next: BulkState) -> bool {
        use BulkState::*;
        match (*self, next) {
            (Idle, Preflighting | NothingToDo | Chunking | Failed) => true,
            (Preflighting, NothingToDo | Aborted | Chunking | Failed) => true,
            (Chunking, Running(0)) => true,
            (Running(i), Running(j)) => j == i + 1,
            (Running(_), Completed | HardStopped | Failed) => true,
            _ => false,
        }
    }
}

/// The state of one bulk invocation.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: BulkState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: BulkState::Idle,
        }
    }

    pub fn state(&self) -> BulkState {
        self.state
    }

    /// Move to `next`, rejecting transitions the machine does not allow.
    pub fn advance(&mut self, next: BulkState) -> BulkResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(BulkError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-attempt execution outcomes produced by the run controller.

use crate::error::StepError;

/// One pass of the run controller over a workflow snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionAttempt {
    /// 1-based attempt counter.
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

/// Terminal state of a single controller pass.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded {
        steps_run: usize,
    },
    Failed {
        /// 0-based index of the failing step.
        index: usize,
        error: StepError,
        /// Best-effort page markup captured at the moment of failure.
        /// Absence is legal and handled downstream.
        snapshot: Option<String>,
    },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded { .. })
    }
}

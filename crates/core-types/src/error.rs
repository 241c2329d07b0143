//! Error taxonomy for step execution and run-level control.

use thiserror::Error;

/// A step-level failure. Recoverable at the attempt level: the healing
/// orchestrator may repair the workflow and retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// A required field of the recorded step is absent or empty.
    #[error("step '{step}' is missing required field '{field}'")]
    MissingField {
        step: &'static str,
        field: &'static str,
    },

    /// Every locator strategy was exhausted without a visible match.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// A page action did not complete within its timeout.
    #[error("action timed out: {0}")]
    ActionTimeout(String),

    /// Navigation failed or did not reach quiescence in time.
    #[error("navigation failed: {0}")]
    NavigationError(String),

    /// No dropdown option matched by value, label or visible text.
    #[error("option not found: {0}")]
    OptionNotFound(String),
}

impl StepError {
    /// Stable kind label for logs and repair requests.
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::MissingField { .. } => "missing_field",
            StepError::ElementNotFound(_) => "element_not_found",
            StepError::ActionTimeout(_) => "action_timeout",
            StepError::NavigationError(_) => "navigation_error",
            StepError::OptionNotFound(_) => "option_not_found",
        }
    }
}

/// A run-level failure. Terminal: the healing orchestrator aborts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// The failure left no page snapshot, so no repair can be requested.
    #[error("no diagnostic context")]
    NoDiagnosticContext,

    /// The oracle answered but produced nothing that parses as a patch.
    #[error("oracle produced no valid patch")]
    InvalidPatch,

    /// The oracle could not be reached or errored at the transport level.
    #[error("repair oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Every permitted attempt was consumed without a successful pass.
    #[error("max attempts exceeded")]
    MaxAttemptsExceeded,
}

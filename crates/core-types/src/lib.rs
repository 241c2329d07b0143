//! Shared primitives for the webreplay replay + self-heal engine
//!
//! Everything that crosses a crate boundary lives here: the recorded
//! workflow model, the step/run error taxonomy, attempt outcomes and
//! the heal patch contract.

pub mod attempt;
pub mod error;
pub mod patch;
pub mod report;
pub mod secret;
pub mod step;
pub mod workflow;

pub use attempt::{AttemptOutcome, ExecutionAttempt};
pub use error::{RunError, StepError};
pub use patch::{HealMode, HealPatch, PatchError, WorkflowPatch};
pub use report::{
    AttemptSummary, ExtractionRecord, FailureSummary, HealedRecord, RunOutcome, RunReport,
};
pub use secret::Secret;
pub use step::{Step, Target};
pub use workflow::Workflow;

//! Run reporting and the persisted healed record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{RunError, StepError};
use crate::step::Step;
use crate::workflow::Workflow;

/// Final result of a healing run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Succeeded {
        /// The snapshot that completed, possibly healed.
        workflow: Workflow,
        /// Whether any heal was applied along the way.
        healed: bool,
        attempts: u32,
    },
    Aborted {
        error: RunError,
        attempts: u32,
        last_failure: Option<FailureSummary>,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { .. })
    }
}

/// Where and how the last attempt failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    pub step_index: usize,
    pub error: String,
}

impl FailureSummary {
    pub fn new(step_index: usize, error: &StepError) -> Self {
        Self {
            step_index,
            error: error.to_string(),
        }
    }
}

/// One line of the audit trail: how far an attempt got.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptSummary {
    pub attempt_number: u32,
    pub steps_completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,
}

/// Data pulled out of the page by extract steps during the winning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRecord {
    pub step_index: usize,
    pub goal: String,
    pub source_url: String,
    pub fields: BTreeMap<String, String>,
}

/// The full run report handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub attempts: Vec<AttemptSummary>,
    pub extractions: Vec<ExtractionRecord>,
}

/// What the persistence sink stores after a healed run succeeds.
/// Metadata fields are `Some` only when the heal revised them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealedRecord {
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_password: Option<bool>,
    pub heal_version: String,
    pub healed_at: DateTime<Utc>,
}

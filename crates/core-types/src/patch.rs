//! Heal patch contract and validation.
//!
//! The repair oracle hands back raw JSON; everything here turns that JSON
//! into a typed patch or rejects it. The engine never inspects free text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::step::Step;

/// How a repair is scoped: one step, or the whole remaining workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealMode {
    Selective,
    Wholesale,
}

impl HealMode {
    pub fn name(&self) -> &'static str {
        match self {
            HealMode::Selective => "selective",
            HealMode::Wholesale => "wholesale",
        }
    }
}

/// A wholesale repair: a full replacement step list, optionally with
/// refreshed workflow metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowPatch {
    pub steps: Vec<Step>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub workflow_analysis: Option<String>,
    #[serde(default)]
    pub requires_password: Option<bool>,
}

/// A validated repair proposal from the oracle.
#[derive(Debug, Clone, PartialEq)]
pub enum HealPatch {
    Step(Step),
    Workflow(WorkflowPatch),
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("patch does not match the expected {mode} shape: {detail}")]
    Shape { mode: &'static str, detail: String },

    #[error("wholesale patch has an empty steps array")]
    EmptySteps,
}

impl HealPatch {
    /// Validate a parsed JSON value against the expected shape for `mode`.
    ///
    /// Selective requires a `type`-tagged step object; wholesale requires a
    /// non-empty `steps` array. Anything else is rejected, which the caller
    /// treats as "no patch".
    pub fn from_value(mode: HealMode, value: Value) -> Result<Self, PatchError> {
        match mode {
            HealMode::Selective => {
                let step: Step =
                    serde_json::from_value(value).map_err(|e| PatchError::Shape {
                        mode: "selective",
                        detail: e.to_string(),
                    })?;
                Ok(HealPatch::Step(step))
            }
            HealMode::Wholesale => {
                let patch: WorkflowPatch =
                    serde_json::from_value(value).map_err(|e| PatchError::Shape {
                        mode: "wholesale",
                        detail: e.to_string(),
                    })?;
                if patch.steps.is_empty() {
                    return Err(PatchError::EmptySteps);
                }
                Ok(HealPatch::Workflow(patch))
            }
        }
    }

    /// Parse and validate raw oracle output in one go.
    pub fn from_str(mode: HealMode, raw: &str) -> Result<Self, PatchError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(mode, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selective_requires_tagged_step() {
        let ok = HealPatch::from_str(
            HealMode::Selective,
            r##"{"type":"click","cssSelector":"#new-login","description":"Click login"}"##,
        )
        .unwrap();
        match ok {
            HealPatch::Step(step) => assert_eq!(step.kind(), "click"),
            other => panic!("unexpected patch: {other:?}"),
        }

        let err = HealPatch::from_str(HealMode::Selective, r##"{"cssSelector":"#x"}"##);
        assert!(matches!(err, Err(PatchError::Shape { mode: "selective", .. })));
    }

    #[test]
    fn wholesale_rejects_empty_steps() {
        let err = HealPatch::from_str(HealMode::Wholesale, r#"{"steps":[]}"#);
        assert!(matches!(err, Err(PatchError::EmptySteps)));
    }

    #[test]
    fn wholesale_carries_metadata() {
        let patch = HealPatch::from_str(
            HealMode::Wholesale,
            r#"{
                "steps": [{"type":"navigation","url":"https://example.com"}],
                "description": "Updated flow",
                "requires_password": true
            }"#,
        )
        .unwrap();
        match patch {
            HealPatch::Workflow(wf) => {
                assert_eq!(wf.steps.len(), 1);
                assert_eq!(wf.description.as_deref(), Some("Updated flow"));
                assert_eq!(wf.requires_password, Some(true));
                assert!(wf.name.is_none());
            }
            other => panic!("unexpected patch: {other:?}"),
        }
    }

    #[test]
    fn non_json_is_rejected() {
        let err = HealPatch::from_str(HealMode::Selective, "I could not repair this step.");
        assert!(matches!(err, Err(PatchError::Json(_))));
    }
}

//! The recorded workflow document.

use serde::{Deserialize, Serialize};

use crate::step::Step;

/// A recorded browser workflow as loaded from disk or handed in by a
/// caller. Treated as immutable during an attempt; healing produces a
/// fresh copy rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_password: Option<bool>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

//! Recorded workflow steps
//!
//! A step is a closed tagged sum over the six recorded action kinds. The
//! serde shape matches the recorder JSON: a snake_case `type` tag plus
//! camelCase type-specific fields. Absent locator fields deserialize to
//! empty strings and are treated as "skip this strategy" downstream.

use serde::{Deserialize, Serialize};

/// One recorded browser action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    #[serde(rename_all = "camelCase")]
    Navigation {
        #[serde(default)]
        url: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Click {
        #[serde(default)]
        target_text: String,
        #[serde(default)]
        element_text: String,
        #[serde(default)]
        css_selector: String,
        #[serde(default)]
        xpath: String,
        #[serde(default)]
        element_tag: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Input {
        #[serde(default)]
        value: String,
        #[serde(default)]
        target_text: String,
        #[serde(default)]
        element_text: String,
        #[serde(default)]
        css_selector: String,
        #[serde(default)]
        xpath: String,
        #[serde(default)]
        element_tag: String,
        #[serde(default)]
        placeholder: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    KeyPress {
        #[serde(default)]
        key: String,
        #[serde(default)]
        target_text: String,
        #[serde(default)]
        element_text: String,
        #[serde(default)]
        css_selector: String,
        #[serde(default)]
        xpath: String,
        #[serde(default)]
        element_tag: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Scroll {
        #[serde(default)]
        scroll_x: i64,
        #[serde(default)]
        scroll_y: i64,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Extract {
        #[serde(default)]
        extraction_goal: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
}

/// Locator-relevant fields of an element-targeting step, as one view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    pub xpath: String,
    pub css_selector: String,
    pub target_text: String,
    pub element_text: String,
    pub placeholder: String,
    pub element_tag: String,
}

impl Target {
    /// Preferred human-visible text for text/role strategies.
    pub fn primary_text(&self) -> Option<&str> {
        let text = if !self.target_text.trim().is_empty() {
            &self.target_text
        } else {
            &self.element_text
        };
        let text = text.trim();
        (!text.is_empty()).then_some(text)
    }
}

impl Step {
    /// Stable kind name, matching the recorder's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Navigation { .. } => "navigation",
            Step::Click { .. } => "click",
            Step::Input { .. } => "input",
            Step::KeyPress { .. } => "key_press",
            Step::Scroll { .. } => "scroll",
            Step::Extract { .. } => "extract",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Step::Navigation { description, .. }
            | Step::Click { description, .. }
            | Step::Input { description, .. }
            | Step::KeyPress { description, .. }
            | Step::Scroll { description, .. }
            | Step::Extract { description, .. } => description,
        }
    }

    /// Recorded per-step timeout in milliseconds, when present.
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            Step::Navigation { timeout, .. }
            | Step::Click { timeout, .. }
            | Step::Input { timeout, .. }
            | Step::KeyPress { timeout, .. }
            | Step::Scroll { timeout, .. }
            | Step::Extract { timeout, .. } => *timeout,
        }
    }

    /// Locator fields for element-targeting steps; `None` for steps that
    /// act on the page as a whole.
    pub fn target(&self) -> Option<Target> {
        match self {
            Step::Click {
                target_text,
                element_text,
                css_selector,
                xpath,
                element_tag,
                ..
            }
            | Step::KeyPress {
                target_text,
                element_text,
                css_selector,
                xpath,
                element_tag,
                ..
            } => Some(Target {
                xpath: xpath.clone(),
                css_selector: css_selector.clone(),
                target_text: target_text.clone(),
                element_text: element_text.clone(),
                placeholder: String::new(),
                element_tag: element_tag.clone(),
            }),
            Step::Input {
                target_text,
                element_text,
                css_selector,
                xpath,
                element_tag,
                placeholder,
                ..
            } => Some(Target {
                xpath: xpath.clone(),
                css_selector: css_selector.clone(),
                target_text: target_text.clone(),
                element_text: element_text.clone(),
                placeholder: placeholder.clone(),
                element_tag: element_tag.clone(),
            }),
            Step::Navigation { .. } | Step::Scroll { .. } | Step::Extract { .. } => None,
        }
    }
}

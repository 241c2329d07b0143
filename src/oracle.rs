//! OpenAI-backed repair and extraction oracle.
//!
//! One chat-completions client serves both ports. Responses are
//! requested as `json_object`, parsed, then validated into typed
//! structures; anything that does not validate is "no patch", never an
//! error the engine has to interpret.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use webreplay_core_types::{HealMode, HealPatch};
use webreplay_engine::{ExtractionOracle, OracleError, RepairOracle, RepairRequest};

use crate::config::OracleConfig;

pub struct OpenAiOracle {
    client: Client,
    config: OracleConfig,
    api_key: String,
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| OracleError("missing OpenAI API key".to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| OracleError(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    async fn chat(&self, system: String, user: String) -> Result<String, OracleError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: 0.0,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| OracleError(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(OracleError(format!("oracle returned {status}: {text}")));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| OracleError(format!("response invalid: {err}")))?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OracleError("response missing content".to_string()))
    }
}

#[async_trait]
impl RepairOracle for OpenAiOracle {
    async fn propose_patch(
        &self,
        request: &RepairRequest,
    ) -> Result<Option<HealPatch>, OracleError> {
        let system = repair_system_prompt(request.mode);
        let user = repair_user_prompt(request);
        let content = self.chat(system, user).await?;
        Ok(patch_from_content(request.mode, &content))
    }
}

#[async_trait]
impl ExtractionOracle for OpenAiOracle {
    async fn extract(
        &self,
        markup: &str,
        goal: &str,
        url: &str,
    ) -> Result<BTreeMap<String, String>, OracleError> {
        let system = "You extract structured data from HTML pages. \
                      Respond with a single flat JSON object whose keys are \
                      short snake_case field names and whose values are the \
                      extracted text. Use an empty object if nothing matches."
            .to_string();
        let user = format!(
            "Extraction goal: {goal}\nPage URL: {url}\n\nPage HTML:\n{markup}"
        );
        let content = self.chat(system, user).await?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|err| OracleError(format!("extraction response is not JSON: {err}")))?;
        Ok(extraction_fields(value))
    }
}

/// Stand-in when healing is disabled or no API key is configured: every
/// repair request yields "no patch".
pub struct NoopOracle;

#[async_trait]
impl RepairOracle for NoopOracle {
    async fn propose_patch(
        &self,
        _request: &RepairRequest,
    ) -> Result<Option<HealPatch>, OracleError> {
        Ok(None)
    }
}

fn repair_system_prompt(mode: HealMode) -> String {
    let scope = match mode {
        HealMode::Selective => {
            "Respond with exactly one corrected step object, carrying the \
             same `type` tag and camelCase fields as the failing step. \
             Update the selectors so the step works on the current page, \
             and refresh its description if the target changed."
        }
        HealMode::Wholesale => {
            "Respond with a JSON object holding a non-empty `steps` array \
             for the whole workflow, fixing the failing step and any later \
             steps that the page change also broke. You may include updated \
             `name`, `description`, `workflow_analysis` and \
             `requires_password` fields when they no longer match."
        }
    };
    format!(
        "You repair recorded browser automation workflows whose steps \
         stopped matching the live page. Use only selectors that exist in \
         the provided HTML. {scope} Respond with JSON only."
    )
}

fn repair_user_prompt(request: &RepairRequest) -> String {
    let mut prompt = String::new();
    if let Some(workflow) = &request.workflow {
        prompt.push_str("Full workflow:\n");
        prompt.push_str(&serde_json::to_string_pretty(workflow).unwrap_or_default());
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Failing step (index {}):\n{}\n\nError: {}\n\nCurrent page HTML:\n{}",
        request.failed_index,
        serde_json::to_string_pretty(&request.failed_step).unwrap_or_default(),
        request.error_text,
        request.page_markup,
    ));
    prompt
}

/// Validate raw oracle content into a patch. Non-JSON content and shape
/// mismatches are logged and collapse to `None`.
fn patch_from_content(mode: HealMode, content: &str) -> Option<HealPatch> {
    match HealPatch::from_str(mode, content) {
        Ok(patch) => Some(patch),
        Err(err) => {
            warn!(mode = mode.name(), error = %err, "oracle content is not a usable patch");
            debug!(content, "rejected oracle content");
            None
        }
    }
}

/// Flatten an extraction response object into field → text. Non-string
/// scalars are stringified; nested values are dropped.
fn extraction_fields(value: Value) -> BTreeMap<String, String> {
    let Value::Object(map) = value else {
        return BTreeMap::new();
    };
    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key, text)),
            Value::Number(n) => Some((key, n.to_string())),
            Value::Bool(b) => Some((key, b.to_string())),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

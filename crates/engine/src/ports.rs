//! Port traits at the engine's seams.
//!
//! The engine owns no browser, no network client and no storage. Each of
//! those is injected behind one of these traits; the CLI wires concrete
//! adapters at startup.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use webreplay_core_types::{HealMode, HealPatch, Step, Workflow};
use webreplay_locator::ElementHandle;

/// Page-side failures, mapped into the step error taxonomy by the executor.
#[derive(Debug, Clone, Error)]
pub enum PageError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("element is gone: {0}")]
    StaleElement(String),
    #[error("no matching option: {0}")]
    OptionMissing(String),
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("page context is gone: {0}")]
    Gone(String),
}

/// Full command surface the executor drives against a live page.
#[async_trait]
pub trait PagePort: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// Wait for the page to settle. Bounded by `timeout`; callers decide
    /// whether expiry is fatal.
    async fn wait_quiescent(&self, timeout: Duration) -> Result<(), PageError>;

    async fn click(&self, element: &ElementHandle, timeout: Duration) -> Result<(), PageError>;

    async fn fill(
        &self,
        element: &ElementHandle,
        value: &str,
        timeout: Duration,
    ) -> Result<(), PageError>;

    async fn press_key(
        &self,
        element: &ElementHandle,
        key: &str,
        timeout: Duration,
    ) -> Result<(), PageError>;

    async fn scroll_to(&self, x: i64, y: i64) -> Result<(), PageError>;

    /// Upper-cased tag name of a resolved element.
    async fn tag_name(&self, element: &ElementHandle) -> Result<String, PageError>;

    async fn select_by_value(
        &self,
        element: &ElementHandle,
        value: &str,
    ) -> Result<(), PageError>;

    async fn select_by_label(
        &self,
        element: &ElementHandle,
        label: &str,
    ) -> Result<(), PageError>;

    /// Click the first visible element whose text matches `text`
    /// case-insensitively. Used as the last dropdown fallback after the
    /// listbox has been opened.
    async fn click_matching_text(&self, text: &str, timeout: Duration) -> Result<(), PageError>;

    async fn page_markup(&self) -> Result<String, PageError>;

    async fn current_url(&self) -> Result<String, PageError>;
}

/// Everything the oracle needs to propose a repair.
#[derive(Debug, Clone)]
pub struct RepairRequest {
    pub mode: HealMode,
    pub failed_step: Step,
    /// Present only in wholesale mode.
    pub workflow: Option<Workflow>,
    pub failed_index: usize,
    pub error_text: String,
    /// Already truncated to the snapshot budget.
    pub page_markup: String,
}

/// Transport-level oracle failure. Distinct from "answered but produced
/// nothing usable", which is `Ok(None)`.
#[derive(Debug, Error)]
#[error("oracle error: {0}")]
pub struct OracleError(pub String);

/// The external repair capability.
#[async_trait]
pub trait RepairOracle: Send + Sync {
    /// `Ok(None)` means the oracle answered but no valid patch could be
    /// extracted; the orchestrator aborts rather than retrying.
    async fn propose_patch(&self, request: &RepairRequest)
        -> Result<Option<HealPatch>, OracleError>;
}

/// Best-effort structured extraction from page markup.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract(
        &self,
        markup: &str,
        goal: &str,
        url: &str,
    ) -> Result<BTreeMap<String, String>, OracleError>;
}

#[derive(Debug, Error)]
#[error("persistence failed: {0}")]
pub struct SinkError(pub String);

/// Stores a healed workflow after the run eventually succeeds.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save(
        &self,
        workflow_id: &str,
        record: &webreplay_core_types::HealedRecord,
    ) -> Result<(), SinkError>;
}

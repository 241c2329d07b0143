//! Scripted in-memory ports for engine scenario tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use webreplay_core_types::{HealPatch, HealedRecord};
use webreplay_locator::{ElementHandle, LocatorSpec, PageQuery, QueryError};

use crate::ports::{
    ExtractionOracle, OracleError, PageError, PagePort, PersistenceSink, RepairOracle,
    RepairRequest, SinkError,
};

/// Fake page: a locator value resolves iff it is in the visible set.
/// Every operation is appended to an order-preserving log.
pub struct FakePage {
    visible: Mutex<HashSet<String>>,
    /// `None` makes markup capture fail, for no-snapshot scenarios.
    markup: Mutex<Option<String>>,
    log: Mutex<Vec<String>>,
    filled: Mutex<Vec<(String, String)>>,
    select_tags: Mutex<HashSet<String>>,
}

impl FakePage {
    pub fn with_visible<I: IntoIterator<Item = &'static str>>(values: I) -> Self {
        Self {
            visible: Mutex::new(values.into_iter().map(String::from).collect()),
            markup: Mutex::new(Some("<html><body>fake</body></html>".to_string())),
            log: Mutex::new(Vec::new()),
            filled: Mutex::new(Vec::new()),
            select_tags: Mutex::new(HashSet::new()),
        }
    }

    pub fn without_markup(self) -> Self {
        *self.markup.lock().unwrap() = None;
        self
    }

    pub fn mark_select(&self, handle: &str) {
        self.select_tags.lock().unwrap().insert(handle.to_string());
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn filled(&self) -> Vec<(String, String)> {
        self.filled.lock().unwrap().clone()
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }
}

#[async_trait]
impl PageQuery for FakePage {
    async fn wait_visible(
        &self,
        spec: &LocatorSpec,
        _timeout: Duration,
    ) -> Result<ElementHandle, QueryError> {
        if self.visible.lock().unwrap().contains(&spec.value) {
            Ok(ElementHandle(spec.value.clone()))
        } else {
            Err(QueryError::NotVisible)
        }
    }
}

#[async_trait]
impl PagePort for FakePage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), PageError> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn wait_quiescent(&self, _timeout: Duration) -> Result<(), PageError> {
        Ok(())
    }

    async fn click(&self, element: &ElementHandle, _timeout: Duration) -> Result<(), PageError> {
        self.record(format!("click:{}", element.as_str()));
        Ok(())
    }

    async fn fill(
        &self,
        element: &ElementHandle,
        value: &str,
        _timeout: Duration,
    ) -> Result<(), PageError> {
        self.record(format!("fill:{}", element.as_str()));
        self.filled
            .lock()
            .unwrap()
            .push((element.as_str().to_string(), value.to_string()));
        Ok(())
    }

    async fn press_key(
        &self,
        element: &ElementHandle,
        key: &str,
        _timeout: Duration,
    ) -> Result<(), PageError> {
        self.record(format!("press:{}:{key}", element.as_str()));
        Ok(())
    }

    async fn scroll_to(&self, x: i64, y: i64) -> Result<(), PageError> {
        self.record(format!("scroll:{x}:{y}"));
        Ok(())
    }

    async fn tag_name(&self, element: &ElementHandle) -> Result<String, PageError> {
        if self.select_tags.lock().unwrap().contains(element.as_str()) {
            Ok("SELECT".to_string())
        } else {
            Ok("INPUT".to_string())
        }
    }

    async fn select_by_value(
        &self,
        element: &ElementHandle,
        value: &str,
    ) -> Result<(), PageError> {
        self.record(format!("select_value:{}:{value}", element.as_str()));
        Ok(())
    }

    async fn select_by_label(
        &self,
        element: &ElementHandle,
        label: &str,
    ) -> Result<(), PageError> {
        self.record(format!("select_label:{}:{label}", element.as_str()));
        Ok(())
    }

    async fn click_matching_text(&self, text: &str, _timeout: Duration) -> Result<(), PageError> {
        self.record(format!("click_text:{text}"));
        Ok(())
    }

    async fn page_markup(&self) -> Result<String, PageError> {
        self.markup
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PageError::Gone("markup unavailable".to_string()))
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok("https://fake.test/page".to_string())
    }
}

/// Scripted oracle: pops one response per call, counts calls.
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<Option<HealPatch>, String>>>,
    pub calls: Mutex<Vec<RepairRequest>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<Option<HealPatch>, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RepairOracle for ScriptedOracle {
    async fn propose_patch(
        &self,
        request: &RepairRequest,
    ) -> Result<Option<HealPatch>, OracleError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(patch)) => Ok(patch),
            Some(Err(msg)) => Err(OracleError(msg)),
            None => Ok(None),
        }
    }
}

/// Records every save; never fails.
#[derive(Default)]
pub struct RecordingSink {
    pub saved: Mutex<Vec<(String, HealedRecord)>>,
}

#[async_trait]
impl PersistenceSink for RecordingSink {
    async fn save(&self, workflow_id: &str, record: &HealedRecord) -> Result<(), SinkError> {
        self.saved
            .lock()
            .unwrap()
            .push((workflow_id.to_string(), record.clone()));
        Ok(())
    }
}

/// Returns a canned field map for every goal.
pub struct CannedExtractor;

#[async_trait]
impl ExtractionOracle for CannedExtractor {
    async fn extract(
        &self,
        _markup: &str,
        goal: &str,
        _url: &str,
    ) -> Result<BTreeMap<String, String>, OracleError> {
        let mut fields = BTreeMap::new();
        fields.insert("goal".to_string(), goal.to_string());
        Ok(fields)
    }
}

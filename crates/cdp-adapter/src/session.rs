//! Live Chromium session implementing the page ports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::{Element, Page};
use dashmap::DashMap;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;
use webreplay_engine::{PageError, PagePort};
use webreplay_locator::{ElementHandle, LocatorSpec, PageQuery, QueryError};

use crate::queries::{build_query, Query};

const POLL_INTERVAL: Duration = Duration::from_millis(150);
const SETTLE_DELAY: Duration = Duration::from_millis(200);

const VISIBILITY_PROBE: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) return false;
    const style = window.getComputedStyle(this);
    return style.visibility !== "hidden" && style.display !== "none" && style.opacity !== "0";
}"#;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to configure browser: {0}")]
    Config(String),
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("failed to open page: {0}")]
    Page(String),
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub window: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window: (1400, 900),
        }
    }
}

/// One browser, one page, strictly sequential commands. Resolved
/// elements are parked in a registry and referenced by opaque handles so
/// the locator and engine crates never see CDP types.
pub struct CdpSession {
    page: Page,
    browser: Mutex<Option<Browser>>,
    handler_task: JoinHandle<()>,
    elements: DashMap<String, Arc<Element>>,
}

impl CdpSession {
    pub async fn launch(options: LaunchOptions) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.window.0, options.window.1);
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(SessionError::Config)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        // The handler stream must be driven for the whole session; its
        // task ending doubles as the disconnect signal.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            debug!("browser handler stream ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Page(e.to_string()))?;

        info!(headless = options.headless, "browser session started");
        Ok(Self {
            page,
            browser: Mutex::new(Some(browser)),
            handler_task,
            elements: DashMap::new(),
        })
    }

    /// False once the browser process or its connection has gone away.
    pub fn is_connected(&self) -> bool {
        !self.handler_task.is_finished()
    }

    /// Close the browser and stop the handler task. Safe to call once;
    /// later page commands fail with a gone-context error.
    pub async fn close(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                warn!(error = %err, "browser close failed");
            }
            let _ = browser.wait().await;
        }
        self.handler_task.abort();
        self.elements.clear();
    }

    fn element(&self, handle: &ElementHandle) -> Result<Arc<Element>, PageError> {
        self.elements
            .get(handle.as_str())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PageError::StaleElement(format!("unknown handle {}", handle.as_str())))
    }

    fn register(&self, element: Element) -> ElementHandle {
        let id = Uuid::new_v4().to_string();
        self.elements.insert(id.clone(), Arc::new(element));
        ElementHandle(id)
    }

    async fn find(&self, query: &Query) -> Result<Element, String> {
        match query {
            Query::Css(selector) => self
                .page
                .find_element(selector.as_str())
                .await
                .map_err(|e| e.to_string()),
            Query::Xpath(xpath) => self
                .page
                .find_xpath(xpath.as_str())
                .await
                .map_err(|e| e.to_string()),
        }
    }

    async fn is_visible(&self, element: &Element) -> bool {
        match element.call_js_fn(VISIBILITY_PROBE, false).await {
            Ok(ret) => ret
                .result
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            Err(err) => {
                debug!(error = %err, "visibility probe failed");
                false
            }
        }
    }

    async fn eval_bool_on(&self, element: &Element, js: String) -> Result<bool, PageError> {
        let ret = element
            .call_js_fn(js, false)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        Ok(ret.result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

#[async_trait]
impl PageQuery for CdpSession {
    async fn wait_visible(
        &self,
        spec: &LocatorSpec,
        timeout: Duration,
    ) -> Result<ElementHandle, QueryError> {
        let query = build_query(spec);
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(&query).await {
                Ok(element) => {
                    if self.is_visible(&element).await {
                        return Ok(self.register(element));
                    }
                }
                Err(err) => debug!(strategy = spec.kind.name(), error = %err, "query missed"),
            }
            if Instant::now() >= deadline {
                return Err(QueryError::NotVisible);
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl PagePort for CdpSession {
    async fn navigate(&self, url: &str, deadline: Duration) -> Result<(), PageError> {
        info!(url, "navigating");
        match timeout(deadline, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(PageError::Navigation(err.to_string())),
            Err(_) => Err(PageError::Timeout(format!("navigation to {url}"))),
        }
    }

    async fn wait_quiescent(&self, deadline: Duration) -> Result<(), PageError> {
        let until = Instant::now() + deadline;
        loop {
            let ready = self
                .page
                .evaluate("document.readyState")
                .await
                .ok()
                .and_then(|r| r.into_value::<String>().ok())
                .map(|state| state == "complete")
                .unwrap_or(false);
            if ready {
                sleep(SETTLE_DELAY).await;
                return Ok(());
            }
            if Instant::now() >= until {
                return Err(PageError::Timeout("page did not reach quiescence".into()));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, handle: &ElementHandle, deadline: Duration) -> Result<(), PageError> {
        let element = self.element(handle)?;
        match timeout(deadline, element.click()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(PageError::Script(err.to_string())),
            Err(_) => Err(PageError::Timeout("click".into())),
        }
    }

    async fn fill(
        &self,
        handle: &ElementHandle,
        value: &str,
        deadline: Duration,
    ) -> Result<(), PageError> {
        let element = self.element(handle)?;
        // A JSON string literal is also a valid JS literal, so the value
        // rides into the page without any quoting of our own.
        let literal = serde_json::to_string(value)
            .map_err(|e| PageError::Script(e.to_string()))?;
        let js = format!(
            r#"function() {{
                this.focus();
                const value = {literal};
                const proto = this.tagName === "TEXTAREA"
                    ? HTMLTextAreaElement.prototype
                    : HTMLInputElement.prototype;
                const descriptor = Object.getOwnPropertyDescriptor(proto, "value");
                if (descriptor && descriptor.set) {{
                    descriptor.set.call(this, value);
                }} else {{
                    this.value = value;
                }}
                this.dispatchEvent(new Event("input", {{ bubbles: true }}));
                this.dispatchEvent(new Event("change", {{ bubbles: true }}));
            }}"#
        );
        match timeout(deadline, element.call_js_fn(js, false)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(PageError::Script(err.to_string())),
            Err(_) => Err(PageError::Timeout("fill".into())),
        }
    }

    async fn press_key(
        &self,
        handle: &ElementHandle,
        key: &str,
        deadline: Duration,
    ) -> Result<(), PageError> {
        let element = self.element(handle)?;
        match timeout(deadline, element.press_key(key)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(PageError::Script(err.to_string())),
            Err(_) => Err(PageError::Timeout(format!("press key {key}"))),
        }
    }

    async fn scroll_to(&self, x: i64, y: i64) -> Result<(), PageError> {
        self.page
            .evaluate(format!("window.scrollTo({x}, {y})"))
            .await
            .map(|_| ())
            .map_err(|e| PageError::Gone(e.to_string()))
    }

    async fn tag_name(&self, handle: &ElementHandle) -> Result<String, PageError> {
        let element = self.element(handle)?;
        let ret = element
            .call_js_fn("function() { return this.tagName; }", false)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        Ok(ret
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    async fn select_by_value(
        &self,
        handle: &ElementHandle,
        value: &str,
    ) -> Result<(), PageError> {
        let element = self.element(handle)?;
        let literal = serde_json::to_string(value)
            .map_err(|e| PageError::Script(e.to_string()))?;
        let js = format!(
            r#"function() {{
                const wanted = {literal};
                for (const option of this.options) {{
                    if (option.value === wanted) {{
                        this.value = option.value;
                        this.dispatchEvent(new Event("change", {{ bubbles: true }}));
                        return true;
                    }}
                }}
                return false;
            }}"#
        );
        if self.eval_bool_on(&element, js).await? {
            Ok(())
        } else {
            Err(PageError::OptionMissing(format!("value {value}")))
        }
    }

    async fn select_by_label(
        &self,
        handle: &ElementHandle,
        label: &str,
    ) -> Result<(), PageError> {
        let element = self.element(handle)?;
        let literal = serde_json::to_string(label)
            .map_err(|e| PageError::Script(e.to_string()))?;
        let js = format!(
            r#"function() {{
                const wanted = {literal}.trim().toLowerCase();
                for (const option of this.options) {{
                    const text = (option.label || option.textContent || "").trim().toLowerCase();
                    if (text === wanted) {{
                        this.value = option.value;
                        this.dispatchEvent(new Event("change", {{ bubbles: true }}));
                        return true;
                    }}
                }}
                return false;
            }}"#
        );
        if self.eval_bool_on(&element, js).await? {
            Ok(())
        } else {
            Err(PageError::OptionMissing(format!("label {label}")))
        }
    }

    async fn click_matching_text(&self, text: &str, deadline: Duration) -> Result<(), PageError> {
        let literal = serde_json::to_string(text)
            .map_err(|e| PageError::Script(e.to_string()))?;
        let js = format!(
            r#"(() => {{
                const needle = {literal}.trim().toLowerCase();
                const nodes = document.querySelectorAll("li, option, a, button, span, div");
                for (const node of nodes) {{
                    const content = (node.textContent || "").trim().toLowerCase();
                    if (content !== needle && !content.includes(needle)) continue;
                    const rect = node.getBoundingClientRect();
                    if (rect.width > 0 && rect.height > 0) {{
                        node.click();
                        return true;
                    }}
                }}
                return false;
            }})()"#
        );
        let matched = match timeout(deadline, self.page.evaluate(js)).await {
            Ok(Ok(result)) => result.into_value::<bool>().unwrap_or(false),
            Ok(Err(err)) => return Err(PageError::Script(err.to_string())),
            Err(_) => return Err(PageError::Timeout("click matching text".into())),
        };
        if matched {
            Ok(())
        } else {
            Err(PageError::OptionMissing(format!("text {text}")))
        }
    }

    async fn page_markup(&self) -> Result<String, PageError> {
        self.page
            .content()
            .await
            .map_err(|e| PageError::Gone(e.to_string()))
    }

    async fn current_url(&self) -> Result<String, PageError> {
        self.page
            .url()
            .await
            .map_err(|e| PageError::Gone(e.to_string()))
            .map(|url| url.unwrap_or_default())
    }
}

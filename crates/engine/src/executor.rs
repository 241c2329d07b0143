//! Single-step execution against a live page.

use std::sync::Arc;

use tracing::{debug, info, warn};
use webreplay_core_types::{ExtractionRecord, Secret, Step, StepError, Target};
use webreplay_locator::{ElementHandle, ElementResolver, LocatorError, PageQuery, RoleHint};

use crate::policy::EnginePolicy;
use crate::ports::{ExtractionOracle, PageError, PagePort};

/// What a completed step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSignal {
    Completed,
    Extracted(ExtractionRecord),
}

/// Executes one step at a time. Holds no cross-step state; the run
/// controller owns ordering and failure handling.
pub struct StepExecutor {
    page: Arc<dyn PagePort>,
    resolver: ElementResolver<Arc<dyn PageQuery>>,
    extractor: Option<Arc<dyn ExtractionOracle>>,
    secret: Option<Secret>,
    policy: EnginePolicy,
}

impl StepExecutor {
    pub fn new(
        page: Arc<dyn PagePort>,
        query: Arc<dyn PageQuery>,
        extractor: Option<Arc<dyn ExtractionOracle>>,
        secret: Option<Secret>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            page,
            resolver: ElementResolver::new(query),
            extractor,
            secret,
            policy,
        }
    }

    /// Run one step. `index` is only used for logging and extraction
    /// records; ordering is the controller's concern.
    pub async fn execute(&self, index: usize, step: &Step) -> Result<StepSignal, StepError> {
        // Let in-flight loads settle before acting; expiry is not fatal.
        if let Err(err) = self.page.wait_quiescent(self.policy.quiescence_timeout).await {
            debug!(step = index, error = %err, "page not quiescent before step");
        }

        info!(step = index, kind = step.kind(), description = step.description(), "executing step");

        match step {
            Step::Navigation { url, timeout, .. } => {
                self.run_navigation(url, *timeout).await?;
                Ok(StepSignal::Completed)
            }
            Step::Click { timeout, .. } => {
                let target = required_target(step)?;
                self.run_click(&target, *timeout).await?;
                Ok(StepSignal::Completed)
            }
            Step::Input { value, timeout, .. } => {
                let target = required_target(step)?;
                self.run_input(step, &target, value, *timeout).await?;
                Ok(StepSignal::Completed)
            }
            Step::KeyPress { key, timeout, .. } => {
                if key.trim().is_empty() {
                    return Err(StepError::MissingField {
                        step: "key_press",
                        field: "key",
                    });
                }
                let target = required_target(step)?;
                self.run_key_press(&target, key, *timeout).await?;
                Ok(StepSignal::Completed)
            }
            Step::Scroll {
                scroll_x, scroll_y, ..
            } => {
                self.page
                    .scroll_to(*scroll_x, *scroll_y)
                    .await
                    .map_err(map_page_err)?;
                Ok(StepSignal::Completed)
            }
            Step::Extract {
                extraction_goal,
                description,
                ..
            } => Ok(self.run_extract(index, extraction_goal, description).await),
        }
    }

    async fn run_navigation(&self, url: &str, timeout: Option<u64>) -> Result<(), StepError> {
        if url.trim().is_empty() {
            return Err(StepError::MissingField {
                step: "navigation",
                field: "url",
            });
        }
        let deadline = self.policy.step_timeout(timeout);
        self.page
            .navigate(url, deadline)
            .await
            .map_err(|e| StepError::NavigationError(e.to_string()))?;
        // Post-navigation settle shares the step deadline and is fatal here.
        self.page
            .wait_quiescent(deadline)
            .await
            .map_err(|e| StepError::NavigationError(e.to_string()))
    }

    async fn run_click(&self, target: &Target, timeout: Option<u64>) -> Result<(), StepError> {
        let element = self.resolve(target, RoleHint::Click).await?;
        self.page
            .click(&element, self.policy.step_timeout(timeout))
            .await
            .map_err(map_page_err)
    }

    async fn run_key_press(
        &self,
        target: &Target,
        key: &str,
        timeout: Option<u64>,
    ) -> Result<(), StepError> {
        let element = self.resolve(target, RoleHint::Input).await?;
        self.page
            .press_key(&element, key, self.policy.step_timeout(timeout))
            .await
            .map_err(map_page_err)
    }

    async fn run_input(
        &self,
        step: &Step,
        target: &Target,
        recorded_value: &str,
        timeout: Option<u64>,
    ) -> Result<(), StepError> {
        if is_choice_control(&target.css_selector) {
            debug!("radio/checkbox target, fill skipped");
            return Ok(());
        }

        let element = self.resolve(target, RoleHint::Input).await?;
        let deadline = self.policy.step_timeout(timeout);

        let is_password = is_password_field(step.description(), target);
        let value = match (&self.secret, is_password) {
            (Some(secret), true) => {
                info!("password field detected, run secret overrides recorded value");
                secret.expose().to_string()
            }
            _ => recorded_value.to_string(),
        };

        if value.is_empty() {
            warn!("input step carries no value, skipping fill");
            return Ok(());
        }

        if self.is_dropdown(step, target, &element).await {
            return self.run_dropdown(&element, &value, deadline).await;
        }

        if is_password {
            debug!(value = "********", "filling input");
        } else {
            debug!(value = %value, "filling input");
        }
        self.page
            .fill(&element, &value, deadline)
            .await
            .map_err(map_page_err)
    }

    /// Dropdown fallback chain: native select by value, then by label,
    /// then open the control and click the matching option text.
    async fn run_dropdown(
        &self,
        element: &ElementHandle,
        value: &str,
        deadline: std::time::Duration,
    ) -> Result<(), StepError> {
        let is_select = matches!(
            self.page.tag_name(element).await.as_deref(),
            Ok("SELECT")
        );

        if is_select {
            match self.page.select_by_value(element, value).await {
                Ok(()) => return Ok(()),
                Err(err) => debug!(error = %err, "select-by-value missed, trying label"),
            }
            return self
                .page
                .select_by_label(element, value)
                .await
                .map_err(|_| StepError::OptionNotFound(value.to_string()));
        }

        // Custom widget: open it, then click the option by visible text.
        self.page
            .click(element, deadline)
            .await
            .map_err(map_page_err)?;
        self.page
            .click_matching_text(value, deadline)
            .await
            .map_err(|_| StepError::OptionNotFound(value.to_string()))
    }

    async fn run_extract(&self, index: usize, goal: &str, description: &str) -> StepSignal {
        let goal = if goal.trim().is_empty() { description } else { goal };
        let Some(extractor) = &self.extractor else {
            warn!(step = index, "no extraction oracle configured, skipping extract step");
            return StepSignal::Completed;
        };

        let markup = match self.page.page_markup().await {
            Ok(markup) => markup,
            Err(err) => {
                warn!(step = index, error = %err, "could not capture markup for extraction");
                return StepSignal::Completed;
            }
        };
        let url = match self.page.current_url().await {
            Ok(url) => url,
            Err(err) => {
                warn!(step = index, error = %err, "could not read page url for extraction");
                String::new()
            }
        };

        match extractor.extract(&markup, goal, &url).await {
            Ok(fields) => {
                info!(step = index, fields = fields.len(), "extraction completed");
                StepSignal::Extracted(ExtractionRecord {
                    step_index: index,
                    goal: goal.to_string(),
                    source_url: url,
                    fields,
                })
            }
            Err(err) => {
                warn!(step = index, error = %err, "extraction failed, continuing run");
                StepSignal::Completed
            }
        }
    }

    async fn resolve(&self, target: &Target, hint: RoleHint) -> Result<ElementHandle, StepError> {
        self.resolver
            .resolve(target, hint, self.policy.locator_timeout)
            .await
            .map(|resolved| resolved.handle)
            .map_err(|err: LocatorError| StepError::ElementNotFound(err.to_string()))
    }

    /// Dropdown-like input: the live or recorded tag is a select, or the
    /// description talks about a dropdown selection.
    async fn is_dropdown(&self, step: &Step, target: &Target, element: &ElementHandle) -> bool {
        if target.element_tag.eq_ignore_ascii_case("select") {
            return true;
        }
        let description = step.description().to_ascii_lowercase();
        if description.contains("dropdown") && description.contains("select") {
            return true;
        }
        matches!(self.page.tag_name(element).await.as_deref(), Ok("SELECT"))
    }
}

fn required_target(step: &Step) -> Result<Target, StepError> {
    step.target().ok_or(StepError::MissingField {
        step: "step",
        field: "target",
    })
}

/// Password fields are recognized by the recorder text, not the live DOM.
fn is_password_field(description: &str, target: &Target) -> bool {
    [description, &target.target_text, &target.css_selector, &target.xpath]
        .iter()
        .any(|field| field.to_ascii_lowercase().contains("password"))
}

/// Radio/checkbox inputs keep their recorded state; filling them would
/// clobber the click that set them.
fn is_choice_control(css_selector: &str) -> bool {
    let css = css_selector.to_ascii_lowercase();
    ["type=\"radio\"", "type='radio'", "type=\"checkbox\"", "type='checkbox'"]
        .iter()
        .any(|needle| css.contains(needle))
}

fn map_page_err(err: PageError) -> StepError {
    match err {
        PageError::Timeout(msg) => StepError::ActionTimeout(msg),
        PageError::StaleElement(msg) => StepError::ElementNotFound(msg),
        PageError::OptionMissing(msg) => StepError::OptionNotFound(msg),
        PageError::Navigation(msg) => StepError::NavigationError(msg),
        PageError::Script(msg) | PageError::Gone(msg) => StepError::ActionTimeout(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_detection_scans_recorder_fields() {
        let target = Target {
            css_selector: "input[type=\"password\"]".into(),
            ..Target::default()
        };
        assert!(is_password_field("Enter value", &target));
        assert!(is_password_field("Enter your Password", &Target::default()));
        assert!(!is_password_field("Enter username", &Target::default()));
    }

    #[test]
    fn choice_controls_are_detected_from_css() {
        assert!(is_choice_control("input[type=\"radio\"].plan"));
        assert!(is_choice_control("input[type='checkbox']"));
        assert!(!is_choice_control("input[type=\"text\"]"));
    }

    #[test]
    fn page_errors_map_into_step_taxonomy() {
        assert!(matches!(
            map_page_err(PageError::Timeout("t".into())),
            StepError::ActionTimeout(_)
        ));
        assert!(matches!(
            map_page_err(PageError::OptionMissing("o".into())),
            StepError::OptionNotFound(_)
        ));
        assert!(matches!(
            map_page_err(PageError::StaleElement("s".into())),
            StepError::ElementNotFound(_)
        ));
    }
}

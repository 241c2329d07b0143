//! One controller pass over a workflow snapshot.

use std::sync::Arc;

use tracing::{info, warn};
use webreplay_core_types::{AttemptOutcome, ExecutionAttempt, ExtractionRecord, Workflow};

use crate::executor::{StepExecutor, StepSignal};
use crate::ports::PagePort;

/// Runs a snapshot's steps strictly in order. The pass moves from
/// pending through running to exactly one terminal outcome; there is no
/// partial or paused state, and nothing after the first failure runs.
pub struct RunController {
    executor: StepExecutor,
    page: Arc<dyn PagePort>,
}

impl RunController {
    pub fn new(executor: StepExecutor, page: Arc<dyn PagePort>) -> Self {
        Self { executor, page }
    }

    pub async fn run_attempt(
        &self,
        workflow: &Workflow,
        attempt_number: u32,
    ) -> (ExecutionAttempt, Vec<ExtractionRecord>) {
        info!(
            attempt = attempt_number,
            steps = workflow.steps.len(),
            workflow = %workflow.name,
            "starting attempt"
        );

        let mut extractions = Vec::new();
        for (index, step) in workflow.steps.iter().enumerate() {
            match self.executor.execute(index, step).await {
                Ok(StepSignal::Completed) => {}
                Ok(StepSignal::Extracted(record)) => extractions.push(record),
                Err(error) => {
                    warn!(attempt = attempt_number, step = index, error = %error, "step failed");
                    // Best effort; a missing snapshot is the
                    // orchestrator's problem, not an abort here.
                    let snapshot = match self.page.page_markup().await {
                        Ok(markup) => Some(markup),
                        Err(err) => {
                            warn!(error = %err, "could not capture failure snapshot");
                            None
                        }
                    };
                    return (
                        ExecutionAttempt {
                            attempt_number,
                            outcome: AttemptOutcome::Failed {
                                index,
                                error,
                                snapshot,
                            },
                        },
                        extractions,
                    );
                }
            }
        }

        info!(attempt = attempt_number, "attempt succeeded");
        (
            ExecutionAttempt {
                attempt_number,
                outcome: AttemptOutcome::Succeeded {
                    steps_run: workflow.steps.len(),
                },
            },
            extractions,
        )
    }
}

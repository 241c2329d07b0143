//! Bounded healing loop around the run controller.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use webreplay_core_types::{
    AttemptOutcome, AttemptSummary, FailureSummary, HealMode, HealPatch, HealedRecord, RunError,
    RunOutcome, RunReport, StepError, Workflow,
};

use crate::controller::RunController;
use crate::policy::EnginePolicy;
use crate::ports::{PersistenceSink, RepairOracle, RepairRequest};

/// Marker written into persisted healed documents.
pub const HEAL_VERSION: &str = "v1";

/// Drives attempts, requests repairs between them, and persists the
/// healed snapshot once a run succeeds.
///
/// Invariants: the controller runs at most `max_attempts` times; no
/// patch is ever requested after the final failure; snapshots change
/// only by applying an oracle patch, copy-on-write.
pub struct HealingOrchestrator {
    controller: RunController,
    oracle: Arc<dyn RepairOracle>,
    sink: Arc<dyn PersistenceSink>,
    policy: EnginePolicy,
}

impl HealingOrchestrator {
    pub fn new(
        controller: RunController,
        oracle: Arc<dyn RepairOracle>,
        sink: Arc<dyn PersistenceSink>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            controller,
            oracle,
            sink,
            policy,
        }
    }

    pub async fn run(&self, workflow: Workflow) -> RunReport {
        let original = workflow.clone();
        let mut current = workflow;
        let mut healed = false;
        let mut summaries: Vec<AttemptSummary> = Vec::new();
        let mut extractions = Vec::new();

        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let (result, mut found) = self.controller.run_attempt(&current, attempt).await;
            extractions.append(&mut found);

            match result.outcome {
                AttemptOutcome::Succeeded { steps_run } => {
                    summaries.push(AttemptSummary {
                        attempt_number: attempt,
                        steps_completed: steps_run,
                        failure: None,
                    });
                    if healed {
                        self.persist_heal(&original, &current).await;
                    }
                    return RunReport {
                        outcome: RunOutcome::Succeeded {
                            workflow: current,
                            healed,
                            attempts: attempt,
                        },
                        attempts: summaries,
                        extractions,
                    };
                }
                AttemptOutcome::Failed {
                    index,
                    error,
                    snapshot,
                } => {
                    let failure = FailureSummary::new(index, &error);
                    summaries.push(AttemptSummary {
                        attempt_number: attempt,
                        steps_completed: index,
                        failure: Some(failure.clone()),
                    });

                    if attempt == max_attempts {
                        info!(attempts = attempt, "attempt budget exhausted");
                        return self.abort(
                            RunError::MaxAttemptsExceeded,
                            attempt,
                            summaries,
                            extractions,
                            Some(failure),
                        );
                    }

                    let Some(snapshot) = snapshot else {
                        warn!(step = index, "failure left no page snapshot");
                        return self.abort(
                            RunError::NoDiagnosticContext,
                            attempt,
                            summaries,
                            extractions,
                            Some(failure),
                        );
                    };

                    match self.request_patch(&current, index, &error, &snapshot).await {
                        Ok(next) => {
                            healed = true;
                            current = next;
                        }
                        Err(run_error) => {
                            return self.abort(
                                run_error,
                                attempt,
                                summaries,
                                extractions,
                                Some(failure),
                            );
                        }
                    }
                }
            }
        }

        // max_attempts >= 1, so the loop always returns from within.
        unreachable!("healing loop must terminate through an attempt outcome")
    }

    /// Ask the oracle for a patch and apply it copy-on-write. Any answer
    /// that is not a mode-matching patch aborts the run.
    async fn request_patch(
        &self,
        current: &Workflow,
        index: usize,
        step_error: &StepError,
        snapshot: &str,
    ) -> Result<Workflow, RunError> {
        let mode = self.policy.heal_mode;
        let request = RepairRequest {
            mode,
            failed_step: current.steps[index].clone(),
            workflow: matches!(mode, HealMode::Wholesale).then(|| current.clone()),
            failed_index: index,
            error_text: step_error.to_string(),
            page_markup: self.policy.truncate_snapshot(snapshot),
        };

        let patch = self
            .oracle
            .propose_patch(&request)
            .await
            .map_err(|err| RunError::OracleUnavailable(err.to_string()))?;

        match (mode, patch) {
            (HealMode::Selective, Some(HealPatch::Step(step))) => {
                if index >= current.steps.len() {
                    return Err(RunError::InvalidPatch);
                }
                info!(step = index, kind = step.kind(), "applying selective heal");
                let mut next = current.clone();
                next.steps[index] = step;
                Ok(next)
            }
            (HealMode::Wholesale, Some(HealPatch::Workflow(patch))) => {
                info!(steps = patch.steps.len(), "applying wholesale heal");
                Ok(Workflow {
                    id: current.id.clone(),
                    name: patch.name.unwrap_or_else(|| current.name.clone()),
                    description: patch
                        .description
                        .unwrap_or_else(|| current.description.clone()),
                    workflow_analysis: patch
                        .workflow_analysis
                        .or_else(|| current.workflow_analysis.clone()),
                    requires_password: patch.requires_password.or(current.requires_password),
                    steps: patch.steps,
                })
            }
            (_, None) => {
                warn!("oracle answered without a usable patch");
                Err(RunError::InvalidPatch)
            }
            (mode, Some(_)) => {
                warn!(mode = mode.name(), "oracle patch shape does not match heal mode");
                Err(RunError::InvalidPatch)
            }
        }
    }

    /// Persist the healed snapshot. Failures are logged, never retried,
    /// and never turn a successful run into a failure.
    async fn persist_heal(&self, original: &Workflow, current: &Workflow) {
        let record = HealedRecord {
            steps: current.steps.clone(),
            name: (current.name != original.name).then(|| current.name.clone()),
            description: (current.description != original.description)
                .then(|| current.description.clone()),
            workflow_analysis: (current.workflow_analysis != original.workflow_analysis)
                .then(|| current.workflow_analysis.clone())
                .flatten(),
            requires_password: (current.requires_password != original.requires_password)
                .then_some(current.requires_password)
                .flatten(),
            heal_version: HEAL_VERSION.to_string(),
            healed_at: Utc::now(),
        };

        match self.sink.save(&current.id, &record).await {
            Ok(()) => info!(workflow = %current.id, "healed workflow persisted"),
            Err(err) => error!(workflow = %current.id, error = %err, "failed to persist healed workflow"),
        }
    }

    fn abort(
        &self,
        error: RunError,
        attempts: u32,
        summaries: Vec<AttemptSummary>,
        extractions: Vec<webreplay_core_types::ExtractionRecord>,
        last_failure: Option<FailureSummary>,
    ) -> RunReport {
        error!(attempts, reason = %error, "run aborted");
        RunReport {
            outcome: RunOutcome::Aborted {
                error,
                attempts,
                last_failure,
            },
            attempts: summaries,
            extractions,
        }
    }
}

//! End-to-end engine scenarios over scripted fake ports.

use std::sync::Arc;

use serde_json::json;
use webreplay_core_types::{
    HealMode, HealPatch, RunError, RunOutcome, Secret, Step, Workflow, WorkflowPatch,
};
use webreplay_locator::PageQuery;

use crate::controller::RunController;
use crate::executor::StepExecutor;
use crate::fakes::{CannedExtractor, FakePage, RecordingSink, ScriptedOracle};
use crate::healer::HealingOrchestrator;
use crate::policy::EnginePolicy;
use crate::ports::PagePort;

fn step(value: serde_json::Value) -> Step {
    serde_json::from_value(value).unwrap()
}

fn workflow(steps: Vec<Step>) -> Workflow {
    Workflow {
        id: "wf-1".to_string(),
        name: "Login flow".to_string(),
        description: "Log into the portal".to_string(),
        workflow_analysis: None,
        requires_password: None,
        steps,
    }
}

struct Rig {
    page: Arc<FakePage>,
    oracle: Arc<ScriptedOracle>,
    sink: Arc<RecordingSink>,
    orchestrator: HealingOrchestrator,
}

fn rig(
    page: FakePage,
    oracle: ScriptedOracle,
    policy: EnginePolicy,
    secret: Option<Secret>,
) -> Rig {
    let page = Arc::new(page);
    let oracle = Arc::new(oracle);
    let sink = Arc::new(RecordingSink::default());
    let executor = StepExecutor::new(
        page.clone() as Arc<dyn PagePort>,
        page.clone() as Arc<dyn PageQuery>,
        Some(Arc::new(CannedExtractor)),
        secret,
        policy.clone(),
    );
    let controller = RunController::new(executor, page.clone() as Arc<dyn PagePort>);
    let orchestrator =
        HealingOrchestrator::new(controller, oracle.clone(), sink.clone(), policy);
    Rig {
        page,
        oracle,
        sink,
        orchestrator,
    }
}

fn login_steps() -> Vec<Step> {
    vec![
        step(json!({"type": "navigation", "url": "https://example.test/login"})),
        step(json!({"type": "click", "cssSelector": "#login", "description": "Open login form"})),
        step(json!({
            "type": "input",
            "cssSelector": "#user",
            "value": "alice",
            "description": "Enter username"
        })),
    ]
}

#[tokio::test]
async fn clean_run_never_consults_oracle() {
    let r = rig(
        FakePage::with_visible(["#login", "#user"]),
        ScriptedOracle::new(vec![]),
        EnginePolicy::default(),
        None,
    );

    let report = r.orchestrator.run(workflow(login_steps())).await;

    match report.outcome {
        RunOutcome::Succeeded {
            healed, attempts, ..
        } => {
            assert!(!healed);
            assert_eq!(attempts, 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(r.oracle.call_count(), 0);
    assert!(r.sink.saved.lock().unwrap().is_empty());
    assert_eq!(r.page.filled(), vec![("#user".to_string(), "alice".to_string())]);
}

#[tokio::test]
async fn selective_heal_replaces_only_the_failed_step() {
    let mut steps = login_steps();
    steps[1] = step(json!({"type": "click", "cssSelector": "#old", "description": "Open login form"}));
    let original = workflow(steps);

    let patched = step(json!({"type": "click", "cssSelector": "#new", "description": "Open login form"}));
    let r = rig(
        FakePage::with_visible(["#new", "#user"]),
        ScriptedOracle::new(vec![Ok(Some(HealPatch::Step(patched.clone())))]),
        EnginePolicy::default(),
        None,
    );

    let report = r.orchestrator.run(original.clone()).await;

    match &report.outcome {
        RunOutcome::Succeeded {
            workflow: healed_wf,
            healed,
            attempts,
        } => {
            assert!(healed);
            assert_eq!(*attempts, 2);
            assert_eq!(healed_wf.steps[1], patched);
            // Untouched steps stay byte-identical to the original.
            assert_eq!(healed_wf.steps[0], original.steps[0]);
            assert_eq!(healed_wf.steps[2], original.steps[2]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // One repair request, scoped to the failing step only.
    assert_eq!(r.oracle.call_count(), 1);
    let request = r.oracle.calls.lock().unwrap()[0].clone();
    assert_eq!(request.mode, HealMode::Selective);
    assert_eq!(request.failed_index, 1);
    assert!(request.workflow.is_none());
    assert!(request.error_text.contains("element not found"));
    assert!(request.page_markup.contains("fake"));

    // Healed snapshot persisted once; unchanged metadata stays absent.
    let saved = r.sink.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    let (id, record) = &saved[0];
    assert_eq!(id, "wf-1");
    assert_eq!(record.steps[1], patched);
    assert!(record.name.is_none());
    assert!(record.description.is_none());
}

#[tokio::test]
async fn wholesale_heal_replaces_the_whole_snapshot() {
    let steps = vec![
        step(json!({"type": "navigation", "url": "https://example.test"})),
        step(json!({"type": "click", "cssSelector": "#old"})),
    ];
    let patch = HealPatch::Workflow(WorkflowPatch {
        steps: vec![
            step(json!({"type": "navigation", "url": "https://example.test"})),
            step(json!({"type": "click", "cssSelector": "#fresh", "description": "Use the new button"})),
        ],
        name: None,
        description: Some("Updated flow".to_string()),
        workflow_analysis: None,
        requires_password: None,
    });
    let r = rig(
        FakePage::with_visible(["#fresh"]),
        ScriptedOracle::new(vec![Ok(Some(patch))]),
        EnginePolicy {
            heal_mode: HealMode::Wholesale,
            ..EnginePolicy::default()
        },
        None,
    );

    let report = r.orchestrator.run(workflow(steps)).await;

    match &report.outcome {
        RunOutcome::Succeeded {
            workflow: healed_wf,
            healed,
            ..
        } => {
            assert!(healed);
            assert_eq!(healed_wf.description, "Updated flow");
            assert_eq!(healed_wf.name, "Login flow");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // Wholesale requests carry the full current snapshot.
    let request = r.oracle.calls.lock().unwrap()[0].clone();
    assert!(request.workflow.is_some());

    let saved = r.sink.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].1.description.as_deref(), Some("Updated flow"));
    assert!(saved[0].1.name.is_none());
}

#[tokio::test]
async fn attempt_budget_is_hard_and_final_failure_requests_no_patch() {
    let steps = vec![step(json!({"type": "click", "cssSelector": "#gone"}))];
    let still_broken = step(json!({"type": "click", "cssSelector": "#still-gone"}));
    let r = rig(
        FakePage::with_visible([]),
        ScriptedOracle::new(vec![Ok(Some(HealPatch::Step(still_broken)))]),
        EnginePolicy {
            max_attempts: 2,
            ..EnginePolicy::default()
        },
        None,
    );

    let report = r.orchestrator.run(workflow(steps)).await;

    match &report.outcome {
        RunOutcome::Aborted {
            error, attempts, ..
        } => {
            assert_eq!(*error, RunError::MaxAttemptsExceeded);
            assert_eq!(*attempts, 2);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    // Exactly two controller passes, and only the first failure asked
    // for a repair.
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(r.oracle.call_count(), 1);
}

#[tokio::test]
async fn missing_snapshot_aborts_before_the_oracle() {
    let steps = vec![step(json!({"type": "click", "cssSelector": "#gone"}))];
    let r = rig(
        FakePage::with_visible([]).without_markup(),
        ScriptedOracle::new(vec![]),
        EnginePolicy::default(),
        None,
    );

    let report = r.orchestrator.run(workflow(steps)).await;

    match &report.outcome {
        RunOutcome::Aborted {
            error, attempts, ..
        } => {
            assert_eq!(*error, RunError::NoDiagnosticContext);
            assert_eq!(*attempts, 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(r.oracle.call_count(), 0);
}

#[tokio::test]
async fn unusable_oracle_answer_aborts_immediately() {
    let steps = vec![step(json!({"type": "click", "cssSelector": "#gone"}))];
    let r = rig(
        FakePage::with_visible([]),
        ScriptedOracle::new(vec![Ok(None)]),
        EnginePolicy::default(),
        None,
    );

    let report = r.orchestrator.run(workflow(steps)).await;

    match &report.outcome {
        RunOutcome::Aborted {
            error, attempts, ..
        } => {
            assert_eq!(*error, RunError::InvalidPatch);
            assert_eq!(*attempts, 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(r.oracle.call_count(), 1);
}

#[tokio::test]
async fn oracle_transport_failure_surfaces_as_unavailable() {
    let steps = vec![step(json!({"type": "click", "cssSelector": "#gone"}))];
    let r = rig(
        FakePage::with_visible([]),
        ScriptedOracle::new(vec![Err("connection refused".to_string())]),
        EnginePolicy::default(),
        None,
    );

    let report = r.orchestrator.run(workflow(steps)).await;

    match &report.outcome {
        RunOutcome::Aborted { error, .. } => {
            assert!(matches!(error, RunError::OracleUnavailable(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn run_secret_overrides_recorded_password_value() {
    let steps = vec![step(json!({
        "type": "input",
        "cssSelector": "#pw",
        "value": "recorded-value",
        "description": "Enter password"
    }))];
    let r = rig(
        FakePage::with_visible(["#pw"]),
        ScriptedOracle::new(vec![]),
        EnginePolicy::default(),
        Some(Secret::new("s3cret!")),
    );

    let report = r.orchestrator.run(workflow(steps)).await;

    assert!(report.outcome.is_success());
    assert_eq!(r.page.filled(), vec![("#pw".to_string(), "s3cret!".to_string())]);
}

#[tokio::test]
async fn select_element_uses_native_selection() {
    let steps = vec![step(json!({
        "type": "input",
        "cssSelector": "#plan",
        "value": "pro",
        "elementTag": "SELECT",
        "description": "Choose a plan"
    }))];
    let page = FakePage::with_visible(["#plan"]);
    page.mark_select("#plan");
    let r = rig(page, ScriptedOracle::new(vec![]), EnginePolicy::default(), None);

    let report = r.orchestrator.run(workflow(steps)).await;

    assert!(report.outcome.is_success());
    assert!(r
        .page
        .log()
        .contains(&"select_value:#plan:pro".to_string()));
    assert!(r.page.filled().is_empty());
}

#[tokio::test]
async fn extraction_results_land_in_the_report() {
    let steps = vec![
        step(json!({"type": "navigation", "url": "https://example.test"})),
        step(json!({"type": "extract", "extractionGoal": "order total"})),
    ];
    let r = rig(
        FakePage::with_visible([]),
        ScriptedOracle::new(vec![]),
        EnginePolicy::default(),
        None,
    );

    let report = r.orchestrator.run(workflow(steps)).await;

    assert!(report.outcome.is_success());
    assert_eq!(report.extractions.len(), 1);
    assert_eq!(report.extractions[0].goal, "order total");
    assert_eq!(report.extractions[0].step_index, 1);
}

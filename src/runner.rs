//! Wires the engine to a live browser session and dispatches runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use webreplay_cdp::{CdpSession, LaunchOptions};
use webreplay_core_types::{HealMode, RunOutcome, RunReport, Secret, Workflow};
use webreplay_engine::{
    EnginePolicy, HealingOrchestrator, PagePort, PersistenceSink, RepairOracle, RunController,
    StepExecutor,
};
use webreplay_locator::PageQuery;

use crate::config::AppConfig;
use crate::oracle::{NoopOracle, OpenAiOracle};
use crate::sink::JsonFileSink;

const LIVENESS_POLL: Duration = Duration::from_secs(1);

/// CLI-level overrides layered on top of the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub headless: Option<bool>,
    pub keep_open: Option<bool>,
    pub max_attempts: Option<u32>,
    pub heal_mode: Option<HealMode>,
    pub no_heal: bool,
    pub password: Option<Secret>,
}

impl RunOverrides {
    fn apply(&self, config: &AppConfig) -> AppConfig {
        let mut effective = config.clone();
        if let Some(headless) = self.headless {
            effective.headless = headless;
        }
        if let Some(keep_open) = self.keep_open {
            effective.keep_open = keep_open;
        }
        if let Some(max_attempts) = self.max_attempts {
            effective.max_attempts = max_attempts.max(1);
        }
        if let Some(mode) = self.heal_mode {
            effective.heal_mode = mode;
        }
        if self.no_heal {
            effective.heal_enabled = false;
        }
        effective
    }
}

/// Replay one workflow file end to end: load, launch, run the healing
/// loop, then release the browser.
pub async fn run_workflow_file(
    path: &Path,
    config: &AppConfig,
    overrides: &RunOverrides,
    cancel: CancellationToken,
) -> Result<RunReport> {
    let config = overrides.apply(config);
    let workflow = load_workflow(path).await?;
    info!(
        workflow = %workflow.name,
        steps = workflow.steps.len(),
        file = %path.display(),
        "loaded workflow"
    );

    let session = Arc::new(
        CdpSession::launch(LaunchOptions {
            headless: config.headless,
            window: (config.window_width, config.window_height),
        })
        .await
        .context("launching browser session")?,
    );

    let report = tokio::select! {
        report = run_on_session(&config, overrides, session.clone(), workflow) => report,
        _ = cancel.cancelled() => {
            warn!("run cancelled, closing browser");
            session.close().await;
            bail!("cancelled");
        }
    };

    if config.keep_open && report.outcome.is_success() {
        info!("run finished, leaving browser open until it is closed");
        while session.is_connected() && !cancel.is_cancelled() {
            tokio::time::sleep(LIVENESS_POLL).await;
        }
    }

    session.close().await;
    Ok(report)
}

async fn run_on_session(
    config: &AppConfig,
    overrides: &RunOverrides,
    session: Arc<CdpSession>,
    workflow: Workflow,
) -> RunReport {
    let heal_active = config.heal_enabled && config.oracle.api_key.is_some();
    if config.heal_enabled && config.oracle.api_key.is_none() {
        warn!("healing requested but no oracle API key is configured; running without repair");
    }

    let policy = EnginePolicy {
        heal_mode: config.heal_mode,
        // Without a working oracle a second pass would replay the same
        // failure, so the loop collapses to a single attempt.
        max_attempts: if heal_active { config.max_attempts.max(1) } else { 1 },
        snapshot_budget: config.snapshot_budget,
        ..EnginePolicy::default()
    };

    let ai = match OpenAiOracle::new(config.oracle.clone()) {
        Ok(oracle) => Some(Arc::new(oracle)),
        Err(_) => None,
    };
    let repair: Arc<dyn RepairOracle> = match (&ai, heal_active) {
        (Some(oracle), true) => oracle.clone(),
        _ => Arc::new(NoopOracle),
    };
    let extractor = ai
        .clone()
        .map(|oracle| oracle as Arc<dyn webreplay_engine::ExtractionOracle>);
    let sink: Arc<dyn PersistenceSink> = Arc::new(JsonFileSink::new(config.healed_dir.clone()));

    let executor = StepExecutor::new(
        session.clone() as Arc<dyn PagePort>,
        session.clone() as Arc<dyn PageQuery>,
        extractor,
        overrides.password.clone(),
        policy.clone(),
    );
    let controller = RunController::new(executor, session as Arc<dyn PagePort>);
    let orchestrator = HealingOrchestrator::new(controller, repair, sink, policy);

    orchestrator.run(workflow).await
}

/// Replay every `.json` workflow in a directory, bounded by the session
/// pool. Individual failures are reported, not fatal to the batch.
pub async fn run_directory(
    dir: &Path,
    config: &AppConfig,
    overrides: &RunOverrides,
    cancel: CancellationToken,
) -> Result<()> {
    let files = workflow_files(dir)?;
    if files.is_empty() {
        bail!("no workflow files found in {}", dir.display());
    }
    info!(count = files.len(), dir = %dir.display(), "dispatching workflow runs");

    let pool = Arc::new(Semaphore::new(config.max_sessions.max(1)));
    let mut tasks = JoinSet::new();
    for file in files {
        let pool = pool.clone();
        let config = config.clone();
        let overrides = overrides.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let _permit = pool.acquire_owned().await;
            let outcome = run_workflow_file(&file, &config, &overrides, cancel).await;
            (file, outcome)
        });
    }

    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((file, Ok(report))) if report.outcome.is_success() => {
                info!(file = %file.display(), "workflow run succeeded");
            }
            Ok((file, Ok(report))) => {
                failures += 1;
                if let RunOutcome::Aborted { error, .. } = &report.outcome {
                    error!(file = %file.display(), reason = %error, "workflow run aborted");
                }
            }
            Ok((file, Err(err))) => {
                failures += 1;
                error!(file = %file.display(), error = %err, "workflow run failed");
            }
            Err(err) => {
                failures += 1;
                error!(error = %err, "workflow task panicked");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} workflow run(s) did not succeed");
    }
    Ok(())
}

async fn load_workflow(path: &Path) -> Result<Workflow> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading workflow file {}", path.display()))?;
    let mut workflow: Workflow = serde_json::from_str(&raw)
        .with_context(|| format!("parsing workflow file {}", path.display()))?;
    if workflow.id.is_empty() {
        workflow.id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workflow".to_string());
    }
    Ok(workflow)
}

fn workflow_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

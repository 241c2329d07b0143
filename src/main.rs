use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use webreplay_core_types::{RunOutcome, RunReport, Secret};

use webreplay_cli::config::{parse_heal_mode, AppConfig};
use webreplay_cli::runner::{run_directory, run_workflow_file, RunOverrides};

#[derive(Parser)]
#[command(name = "webreplay", version, about = "Self-healing replay of recorded browser workflows")]
struct Cli {
    /// Optional JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a single workflow file
    Run {
        /// Path to the workflow JSON file
        file: PathBuf,
        #[command(flatten)]
        flags: RunFlags,
    },
    /// Replay every workflow JSON file in a directory
    RunDir {
        /// Directory holding workflow JSON files
        dir: PathBuf,
        #[command(flatten)]
        flags: RunFlags,
    },
}

#[derive(Args, Clone)]
struct RunFlags {
    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Keep the browser open after a successful run until it is closed
    #[arg(long)]
    keep_open: bool,

    /// Maximum healing attempts per workflow
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Healing scope: selective or wholesale
    #[arg(long)]
    heal_mode: Option<String>,

    /// Password for steps that fill a password field
    #[arg(long)]
    password: Option<String>,

    /// Disable healing; any step failure aborts the run
    #[arg(long)]
    no_heal: bool,
}

impl RunFlags {
    fn overrides(&self) -> RunOverrides {
        RunOverrides {
            headless: self.headless.then_some(true),
            keep_open: self.keep_open.then_some(true),
            max_attempts: self.max_attempts,
            heal_mode: self.heal_mode.as_deref().map(parse_heal_mode),
            no_heal: self.no_heal,
            password: self.password.clone().map(Secret::new),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, shutting down");
            signal_cancel.cancel();
        }
    });

    match cli.command {
        Commands::Run { file, flags } => {
            let report = run_workflow_file(&file, &config, &flags.overrides(), cancel).await?;
            print_report(&report)
        }
        Commands::RunDir { dir, flags } => {
            run_directory(&dir, &config, &flags.overrides(), cancel).await
        }
    }
}

fn print_report(report: &RunReport) -> Result<()> {
    for extraction in &report.extractions {
        println!("{}", serde_json::to_string_pretty(extraction)?);
    }
    match &report.outcome {
        RunOutcome::Succeeded {
            healed, attempts, ..
        } => {
            info!(attempts, healed, "workflow run succeeded");
            Ok(())
        }
        RunOutcome::Aborted {
            error,
            attempts,
            last_failure,
        } => {
            if let Some(failure) = last_failure {
                warn!(
                    step = failure.step_index,
                    error = %failure.error,
                    "last failing step"
                );
            }
            bail!("run aborted after {attempts} attempt(s): {error}")
        }
    }
}

//! Layered application configuration: defaults, optional JSON file,
//! `WEBREPLAY_*` environment overrides, in that order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use webreplay_core_types::HealMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub headless: bool,
    pub keep_open: bool,
    pub heal_enabled: bool,
    pub heal_mode: HealMode,
    pub max_attempts: u32,
    /// Concurrent browser sessions for directory runs.
    pub max_sessions: usize,
    pub window_width: u32,
    pub window_height: u32,
    pub snapshot_budget: usize,
    /// Where healed workflow documents are written.
    pub healed_dir: PathBuf,
    pub oracle: OracleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Read from `OPENAI_API_KEY`; absent key disables the oracle.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            headless: false,
            keep_open: false,
            heal_enabled: true,
            heal_mode: HealMode::Selective,
            max_attempts: 3,
            max_sessions: 4,
            window_width: 1400,
            window_height: 900,
            snapshot_budget: 60_000,
            healed_dir: PathBuf::from("healed"),
            oracle: OracleConfig::default(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load defaults, merge an optional JSON file, then apply
    /// environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(value) = env_bool("WEBREPLAY_HEADLESS") {
            self.headless = value;
        }
        if let Some(value) = env_bool("WEBREPLAY_KEEP_OPEN") {
            self.keep_open = value;
        }
        if let Some(value) = env_bool("WEBREPLAY_HEAL") {
            self.heal_enabled = value;
        }
        if let Ok(value) = std::env::var("WEBREPLAY_HEAL_MODE") {
            self.heal_mode = parse_heal_mode(&value);
        }
        if let Some(value) = env_parse::<u32>("WEBREPLAY_MAX_ATTEMPTS") {
            self.max_attempts = value.max(1);
        }
        if let Some(value) = env_parse::<usize>("WEBREPLAY_MAX_SESSIONS") {
            self.max_sessions = value.max(1);
        }
        if let Some(value) = env_parse::<usize>("WEBREPLAY_SNAPSHOT_BUDGET") {
            self.snapshot_budget = value;
        }
        if let Ok(value) = std::env::var("WEBREPLAY_HEALED_DIR") {
            self.healed_dir = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("WEBREPLAY_ORACLE_API_BASE") {
            self.oracle.api_base = value;
        }
        if let Ok(value) = std::env::var("WEBREPLAY_ORACLE_MODEL") {
            self.oracle.model = value;
        }
        if let Ok(value) = std::env::var("OPENAI_API_KEY") {
            if !value.is_empty() {
                self.oracle.api_key = Some(value);
            }
        }
    }
}

pub fn parse_heal_mode(value: &str) -> HealMode {
    match value.trim().to_ascii_lowercase().as_str() {
        "wholesale" => HealMode::Wholesale,
        _ => HealMode::Selective,
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

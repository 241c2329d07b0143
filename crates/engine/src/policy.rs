//! Tunables for execution and healing.

use std::time::Duration;

use webreplay_core_types::HealMode;

/// Marker appended when page markup is cut to fit the snapshot budget.
pub const SNAPSHOT_TRUNCATION_MARKER: &str = "<!-- truncated -->";

/// Knobs threaded through executor, controller and orchestrator.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
    pub heal_mode: HealMode,
    /// Upper bound on controller passes, counting the first.
    pub max_attempts: u32,
    /// Visibility wait applied per locator strategy.
    pub locator_timeout: Duration,
    /// Action timeout when a step records none.
    pub default_step_timeout: Duration,
    /// Bound on the pre-dispatch quiescence wait.
    pub quiescence_timeout: Duration,
    /// Character budget for page markup sent to the oracle.
    pub snapshot_budget: usize,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            heal_mode: HealMode::Selective,
            max_attempts: 3,
            locator_timeout: Duration::from_millis(1500),
            default_step_timeout: Duration::from_secs(10),
            quiescence_timeout: Duration::from_secs(2),
            snapshot_budget: 60_000,
        }
    }
}

impl EnginePolicy {
    /// Effective timeout for a step: its recorded value or the default.
    pub fn step_timeout(&self, recorded_ms: Option<u64>) -> Duration {
        recorded_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_step_timeout)
    }

    /// Tail-truncate markup to the budget, appending the marker. Cuts on
    /// a char boundary so multi-byte content cannot split.
    pub fn truncate_snapshot(&self, markup: &str) -> String {
        if markup.len() <= self.snapshot_budget {
            return markup.to_string();
        }
        let mut cut = self.snapshot_budget;
        while cut > 0 && !markup.is_char_boundary(cut) {
            cut -= 1;
        }
        let mut out = markup[..cut].to_string();
        out.push_str(SNAPSHOT_TRUNCATION_MARKER);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_markup_passes_through() {
        let policy = EnginePolicy::default();
        assert_eq!(policy.truncate_snapshot("<html/>"), "<html/>");
    }

    #[test]
    fn long_markup_is_tail_truncated_with_marker() {
        let policy = EnginePolicy {
            snapshot_budget: 10,
            ..EnginePolicy::default()
        };
        let out = policy.truncate_snapshot("0123456789abcdef");
        assert_eq!(out, format!("0123456789{SNAPSHOT_TRUNCATION_MARKER}"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let policy = EnginePolicy {
            snapshot_budget: 5,
            ..EnginePolicy::default()
        };
        // Four-byte char straddling the cut point.
        let out = policy.truncate_snapshot("abcd🦀efgh");
        assert!(out.starts_with("abcd"));
        assert!(out.ends_with(SNAPSHOT_TRUNCATION_MARKER));
    }
}

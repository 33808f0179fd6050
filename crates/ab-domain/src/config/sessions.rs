use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Bounded ring buffer capacity for per-session history.
    #[serde(default = "d_history_capacity")]
    pub history_capacity: usize,
    /// How long a reconnect attempt may take before the session is marked
    /// `degraded`.
    #[serde(default = "d_reconnect_grace_ms")]
    pub reconnect_grace_ms: u64,
    /// How long a session may sit with no consumer/backend traffic before
    /// the idle policy transitions it to `idle`.
    #[serde(default = "d_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Process log ring capacity (lines) kept per session for diagnostics.
    #[serde(default = "d_process_log_capacity")]
    pub process_log_capacity: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            history_capacity: d_history_capacity(),
            reconnect_grace_ms: d_reconnect_grace_ms(),
            idle_timeout_ms: d_idle_timeout_ms(),
            process_log_capacity: d_process_log_capacity(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_history_capacity() -> usize {
    500
}
fn d_reconnect_grace_ms() -> u64 {
    5_000
}
fn d_idle_timeout_ms() -> u64 {
    15 * 60 * 1000
}
fn d_process_log_capacity() -> usize {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = SessionsConfig::default();
        assert_eq!(cfg.history_capacity, 500);
        assert_eq!(cfg.reconnect_grace_ms, 5_000);
        assert_eq!(cfg.process_log_capacity, 500);
    }
}

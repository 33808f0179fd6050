use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Launcher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Upper bound on concurrently running backend sessions.
    #[serde(default = "d_max_sessions")]
    pub max_sessions: usize,
    /// How long the inverted-socket registry waits for a CLI-initiated
    /// dial-back before giving up on a launch.
    #[serde(default = "d_socket_registry_timeout_ms")]
    pub socket_registry_timeout_ms: u64,
    /// Child command template per adapter kind, e.g.
    /// `{"claude_agent_sdk": ["claude-agent-sdk", "--json-rpc"]}`.
    #[serde(default)]
    pub command_templates: HashMap<String, Vec<String>>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            max_sessions: d_max_sessions(),
            socket_registry_timeout_ms: d_socket_registry_timeout_ms(),
            command_templates: HashMap::new(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_sessions() -> usize {
    32
}
fn d_socket_registry_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_socket_registry_timeout_is_30s() {
        assert_eq!(LauncherConfig::default().socket_registry_timeout_ms, 30_000);
    }

    #[test]
    fn default_max_sessions_is_positive() {
        assert!(LauncherConfig::default().max_sessions > 0);
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-adapter-kind options, keyed by adapter name (`"claude_sdk_url"`,
/// `"claude_agent_sdk"`, `"acp"`, `"gemini"`, `"opencode"`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdaptersConfig {
    #[serde(default)]
    pub entries: HashMap<String, AdapterEntryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterEntryConfig {
    /// Whether this adapter kind may be used to launch new sessions.
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// JSON-RPC / handshake request timeout.
    #[serde(default = "d_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// SSE ingestion buffer cap in bytes (Opencode only; ignored otherwise).
    #[serde(default = "d_sse_buffer_cap_bytes")]
    pub sse_buffer_cap_bytes: usize,
    /// Max consecutive non-JSON lines tolerated on a JSON-RPC stdout stream
    /// before the adapter declares the backend broken.
    #[serde(default = "d_max_skip_lines")]
    pub max_skip_lines: u32,
}

impl Default for AdapterEntryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            handshake_timeout_ms: d_handshake_timeout_ms(),
            sse_buffer_cap_bytes: d_sse_buffer_cap_bytes(),
            max_skip_lines: d_max_skip_lines(),
        }
    }
}

impl AdaptersConfig {
    pub fn for_kind(&self, kind: &str) -> AdapterEntryConfig {
        self.entries.get(kind).cloned().unwrap_or_default()
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_handshake_timeout_ms() -> u64 {
    10_000
}
fn d_sse_buffer_cap_bytes() -> usize {
    10 * 1024 * 1024
}
fn d_max_skip_lines() -> u32 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_adapter_kind_gets_defaults() {
        let cfg = AdaptersConfig::default();
        let entry = cfg.for_kind("gemini");
        assert!(entry.enabled);
        assert_eq!(entry.sse_buffer_cap_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn configured_entry_overrides_defaults() {
        let mut cfg = AdaptersConfig::default();
        cfg.entries.insert(
            "opencode".into(),
            AdapterEntryConfig {
                enabled: false,
                ..AdapterEntryConfig::default()
            },
        );
        assert!(!cfg.for_kind("opencode").enabled);
    }
}

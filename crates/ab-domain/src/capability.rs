use serde::{Deserialize, Serialize};

/// What a backend adapter instance can do. The runtime probes this once at
/// attach time and uses it to decide whether a slash command, interrupt, or
/// reconnect is something the adapter itself can satisfy (`AdapterNative`)
/// or whether the chain has to fall back to a local/passthrough handler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdapterCapabilities {
    pub interruptible: bool,
    pub configurable: bool,
    pub permission_handler: bool,
    pub reconnectable: bool,
}

impl Default for AdapterCapabilities {
    fn default() -> Self {
        Self {
            interruptible: false,
            configurable: false,
            permission_handler: false,
            reconnectable: false,
        }
    }
}

/// Runtime availability of a backend adapter, surfaced on the admin/doctor
/// surface and used by the launcher to decide whether to spawn a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
    Degraded,
}

/// The five backend kinds the adapter registry knows how to speak to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    ClaudeSdkUrl,
    ClaudeAgentSdk,
    Acp,
    Gemini,
    Opencode,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::ClaudeSdkUrl => "claude_sdk_url",
            AdapterKind::ClaudeAgentSdk => "claude_agent_sdk",
            AdapterKind::Acp => "acp",
            AdapterKind::Gemini => "gemini",
            AdapterKind::Opencode => "opencode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capabilities_are_all_false() {
        let caps = AdapterCapabilities::default();
        assert!(!caps.interruptible);
        assert!(!caps.configurable);
        assert!(!caps.permission_handler);
        assert!(!caps.reconnectable);
    }

    #[test]
    fn adapter_kind_as_str() {
        assert_eq!(AdapterKind::ClaudeSdkUrl.as_str(), "claude_sdk_url");
        assert_eq!(AdapterKind::Opencode.as_str(), "opencode");
    }
}

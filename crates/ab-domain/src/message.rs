use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The single wire schema every backend adapter normalizes into and out of.
///
/// Adapters translate their backend's native protocol (JSON-RPC over stdio,
/// ACP frames, SSE events, …) to and from `UnifiedMessage` so the runtime,
/// consumer broadcaster, and session history never see backend-specific
/// shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl UnifiedMessage {
    pub fn new(kind: MessageKind, role: MessageRole, content: Vec<ContentBlock>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            role,
            content,
            metadata: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self::new(MessageKind::Text, role, vec![ContentBlock::Text { text: text.into() }])
    }

    /// Concatenate all `Text` blocks, ignoring tool/thinking/image blocks.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    ToolUse,
    ToolResult,
    Thinking,
    PermissionRequest,
    PermissionResponse,
    Status,
    Error,
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    Backend,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        is_error: bool,
        content: String,
    },
    Thinking {
        text: String,
    },
    Image {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
}

/// Lifecycle states of a session, per the runtime's state machine. Only the
/// transitions in [`ALLOWED_TRANSITIONS`] are legal; anything else is an
/// `Error::InvalidLifecycleTransition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    AwaitingBackend,
    Active,
    Idle,
    Degraded,
    Closing,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Starting => "starting",
            SessionState::AwaitingBackend => "awaiting_backend",
            SessionState::Active => "active",
            SessionState::Idle => "idle",
            SessionState::Degraded => "degraded",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        }
    }
}

/// The allowed state transition table. A transition not listed here is
/// rejected by the runtime as `Error::InvalidLifecycleTransition`.
pub const ALLOWED_TRANSITIONS: &[(SessionState, SessionState)] = &[
    (SessionState::Starting, SessionState::AwaitingBackend),
    (SessionState::Starting, SessionState::Closing),
    (SessionState::Starting, SessionState::Closed),
    (SessionState::AwaitingBackend, SessionState::Active),
    (SessionState::AwaitingBackend, SessionState::Degraded),
    (SessionState::AwaitingBackend, SessionState::Closing),
    (SessionState::AwaitingBackend, SessionState::Closed),
    (SessionState::Active, SessionState::Idle),
    (SessionState::Active, SessionState::Degraded),
    (SessionState::Active, SessionState::Closing),
    (SessionState::Active, SessionState::Closed),
    (SessionState::Idle, SessionState::Active),
    (SessionState::Idle, SessionState::Degraded),
    (SessionState::Idle, SessionState::Closing),
    (SessionState::Idle, SessionState::Closed),
    (SessionState::Degraded, SessionState::AwaitingBackend),
    (SessionState::Degraded, SessionState::Active),
    (SessionState::Degraded, SessionState::Closing),
    (SessionState::Degraded, SessionState::Closed),
    (SessionState::Closing, SessionState::Closed),
];

pub fn is_allowed_transition(from: SessionState, to: SessionState) -> bool {
    from == to || ALLOWED_TRANSITIONS.contains(&(from, to))
}

/// A permission request raised by a backend, pending a consumer's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: String,
    pub session_id: String,
    pub tool_name: String,
    pub input: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    Allow,
    AllowAlways,
    Deny,
}

/// Shared state for a team of collaborating sessions (spec.md's TeamState).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TeamState {
    pub team_id: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub claimed_tasks: HashMap<String, String>,
}

pub mod capability;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod message;
pub mod redact;
pub mod trace;

pub use capability::{AdapterCapabilities, AdapterKind, Availability};
pub use config::Config;
pub use error::{Error, Result};
pub use events::DomainEvent;
pub use message::{
    is_allowed_transition, ContentBlock, MessageKind, MessageRole, PermissionDecision,
    PermissionRequest, SessionState, TeamState, UnifiedMessage, ALLOWED_TRANSITIONS,
};
pub use trace::TraceEvent;

/// Persisted daemon state, written atomically to disk on `serve` startup
/// and removed on graceful shutdown.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DaemonState {
    pub pid: u32,
    pub port: u16,
    pub heartbeat: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub control_api_token: String,
}

/// Current schema version for persisted session state. Bumped whenever
/// [`crate::message`]'s session-facing shapes change in a way that isn't
/// backward compatible on read.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

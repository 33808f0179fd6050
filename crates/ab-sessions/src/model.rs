//! The in-memory `Session` and its persistable `SessionInfo` envelope.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ab_domain::capability::AdapterKind;
use ab_domain::message::{PermissionRequest, SessionState, UnifiedMessage};

use crate::ring::RingBuffer;

/// One live conversation. Exclusively owned and mutated by the Session
/// Runtime; the repository only ever holds it for lookup and persistence.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub cwd: String,
    pub adapter: AdapterKind,
    pub model: Option<String>,
    pub permission_mode: String,
    pub state: SessionState,
    pub last_activity: DateTime<Utc>,
    pub consumers: HashSet<String>,
    pub pending_permissions: HashMap<String, PermissionRequest>,
    pub history: RingBuffer<UnifiedMessage>,
    pub pending_outbound: VecDeque<UnifiedMessage>,
    pub backend_session_id: Option<String>,
    pub pid: Option<u32>,
}

impl Session {
    pub fn new(id: String, cwd: String, adapter: AdapterKind, history_capacity: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            cwd,
            adapter,
            model: None,
            permission_mode: "default".into(),
            state: SessionState::Starting,
            last_activity: now,
            consumers: HashSet::new(),
            pending_permissions: HashMap::new(),
            history: RingBuffer::new(history_capacity),
            pending_outbound: VecDeque::new(),
            backend_session_id: None,
            pid: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn to_info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            adapter: self.adapter,
            backend_session_id: self.backend_session_id.clone(),
            archived: matches!(self.state, SessionState::Closed),
            cwd: self.cwd.clone(),
            created_at: self.created_at,
            state: self.state,
            pid: self.pid,
            adapter_options: serde_json::Value::Null,
            message_history: self.history.to_vec(),
            pending_messages: self.pending_outbound.iter().cloned().collect(),
            pending_permissions: self.pending_permissions.clone(),
            schema_version: ab_domain::CURRENT_SCHEMA_VERSION,
        }
    }
}

/// The persistable metadata envelope stored in the repository. Carries a
/// `schema_version`; older versions are migrated forward on load by
/// [`crate::migrate::migrate_session`] and unrecognized future versions are
/// discarded as corrupt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub adapter: AdapterKind,
    #[serde(default)]
    pub backend_session_id: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub cwd: String,
    pub created_at: DateTime<Utc>,
    pub state: SessionState,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub adapter_options: serde_json::Value,
    #[serde(default)]
    pub message_history: Vec<UnifiedMessage>,
    #[serde(default)]
    pub pending_messages: Vec<UnifiedMessage>,
    #[serde(default)]
    pub pending_permissions: HashMap<String, PermissionRequest>,
    #[serde(default)]
    pub schema_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_info_reflects_closed_state_as_archived() {
        let mut session = Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10);
        session.state = SessionState::Closed;
        let info = session.to_info();
        assert!(info.archived);
        assert_eq!(info.schema_version, ab_domain::CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn new_session_starts_in_starting_state() {
        let session = Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10);
        assert_eq!(session.state, SessionState::Starting);
        assert!(session.backend_session_id.is_none());
    }
}

//! Forward-migration for persisted [`SessionInfo`] snapshots.
//!
//! `migrate_session` is total: it never panics on malformed input, returning
//! `None` for anything it cannot safely bring forward to
//! [`ab_domain::CURRENT_SCHEMA_VERSION`].

use ab_domain::message::SessionState;

use crate::model::SessionInfo;

/// Migrate a raw persisted record forward to the current schema. Returns
/// `None` for non-object input, a missing id/state, or a `schema_version`
/// newer than this build understands (treated as corrupt rather than
/// guessed-at).
pub fn migrate_session(raw: serde_json::Value) -> Option<SessionInfo> {
    let obj = raw.as_object()?;

    let version = obj.get("schema_version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    if version > ab_domain::CURRENT_SCHEMA_VERSION {
        return None;
    }

    let id = obj.get("id")?.as_str()?.to_string();
    let state_raw = obj.get("state")?.as_str()?;
    let state = parse_state(state_raw)?;

    let mut info: SessionInfo = serde_json::from_value(raw).ok().unwrap_or_else(|| SessionInfo {
        id: id.clone(),
        adapter: ab_domain::capability::AdapterKind::Acp,
        backend_session_id: None,
        archived: false,
        cwd: String::new(),
        created_at: chrono::Utc::now(),
        state,
        pid: None,
        adapter_options: serde_json::Value::Null,
        message_history: Vec::new(),
        pending_messages: Vec::new(),
        pending_permissions: std::collections::HashMap::new(),
        schema_version: ab_domain::CURRENT_SCHEMA_VERSION,
    });

    // v0 ("unversioned") records gain empty collections rather than being
    // rejected outright — the absent fields already deserialize to their
    // `#[serde(default)]` empties, this just normalizes the stamped version.
    info.schema_version = ab_domain::CURRENT_SCHEMA_VERSION;
    Some(info)
}

fn parse_state(raw: &str) -> Option<SessionState> {
    Some(match raw {
        "starting" => SessionState::Starting,
        "awaiting_backend" => SessionState::AwaitingBackend,
        "active" => SessionState::Active,
        "idle" => SessionState::Idle,
        "degraded" => SessionState::Degraded,
        "closing" => SessionState::Closing,
        "closed" => SessionState::Closed,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object_input() {
        assert!(migrate_session(json!("not an object")).is_none());
    }

    #[test]
    fn rejects_missing_id() {
        assert!(migrate_session(json!({"state": "active"})).is_none());
    }

    #[test]
    fn rejects_missing_state() {
        assert!(migrate_session(json!({"id": "s1"})).is_none());
    }

    #[test]
    fn rejects_future_schema_version() {
        let raw = json!({"id": "s1", "state": "active", "schema_version": 9999});
        assert!(migrate_session(raw).is_none());
    }

    #[test]
    fn unversioned_record_gains_current_schema_version() {
        let raw = json!({
            "id": "s1",
            "adapter": "acp",
            "cwd": "/tmp",
            "created_at": chrono::Utc::now().to_rfc3339(),
            "state": "active",
        });
        let info = migrate_session(raw).unwrap();
        assert_eq!(info.schema_version, ab_domain::CURRENT_SCHEMA_VERSION);
        assert!(info.message_history.is_empty());
        assert!(info.pending_messages.is_empty());
        assert!(info.pending_permissions.is_empty());
    }

    #[test]
    fn rejects_unrecognized_state_string() {
        let raw = json!({"id": "s1", "state": "frobnicating"});
        assert!(migrate_session(raw).is_none());
    }
}

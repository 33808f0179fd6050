//! Permission Request Plane: correlates a backend-raised permission request
//! with a consumer's later decision. Entries live on the session (so they
//! survive consumer churn) and are purged only on session close.

use ab_domain::message::{PermissionDecision, PermissionRequest};
use ab_sessions::Session;

/// Allocate (or accept a backend-given) request id and register the pending
/// entry on the session.
pub fn register(session: &mut Session, request_id: Option<String>, tool_name: String, input: serde_json::Value) -> PermissionRequest {
    let id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let entry = PermissionRequest {
        id: id.clone(),
        session_id: session.id.clone(),
        tool_name,
        input,
        suggestions: None,
        created_at: chrono::Utc::now(),
    };
    session.pending_permissions.insert(id, entry.clone());
    entry
}

/// Resolve a pending request by id, removing it. Returns `None` for an
/// unknown request id — per spec, unknown ids are logged and dropped
/// without producing backend traffic.
pub fn resolve(session: &mut Session, request_id: &str) -> Option<PermissionRequest> {
    session.pending_permissions.remove(request_id)
}

/// Purge every pending entry, called when the session reaches `closed`.
pub fn purge_all(session: &mut Session) {
    session.pending_permissions.clear();
}

/// Translate a resolved decision into the backend's native acknowledgement
/// subtype, matching each adapter's own vocabulary for the ack.
pub fn ack_subtype(_decision: &PermissionDecision) -> &'static str {
    // Every decision acks the same way; the decision payload itself (not
    // the subtype) is what tells the backend allow from deny.
    "success"
}

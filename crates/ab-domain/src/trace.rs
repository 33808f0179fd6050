use serde::Serialize;

/// Structured trace events emitted across all agentbroker crates as a log
/// sink. Distinct from [`crate::events::DomainEvent`]: this is a one-way
/// feed into `tracing`, not a pub/sub primitive anything subscribes to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: String,
        adapter: String,
    },
    StateTransition {
        session_id: String,
        from: String,
        to: String,
    },
    AdapterConnected {
        session_id: String,
        adapter: String,
        duration_ms: u64,
    },
    AdapterDisconnected {
        session_id: String,
        adapter: String,
        reason: String,
    },
    SlashCommandDispatched {
        session_id: String,
        command: String,
        route: String,
    },
    PermissionRequested {
        session_id: String,
        request_id: String,
        tool_name: String,
    },
    PermissionResolved {
        session_id: String,
        request_id: String,
        decision: String,
    },
    ConsumerAttached {
        session_id: String,
        consumer_id: String,
    },
    ConsumerDropped {
        session_id: String,
        consumer_id: String,
        queued_messages: usize,
    },
    ReconnectAttempt {
        session_id: String,
        attempt: u32,
        backoff_ms: u64,
    },
    SessionMigrated {
        session_id: String,
        from_version: u32,
        to_version: u32,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ab_event");
    }
}

use serde::{Deserialize, Serialize};

/// Events published on the Domain Event Bus. Unlike [`crate::trace::TraceEvent`]
/// these are consumed by policies and admin subscribers, not just logged —
/// `ReconnectPolicy`/`IdlePolicy` in `ab-runtime` subscribe to a stream of
/// these to decide when to act.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    SessionCreated {
        session_id: String,
    },
    SessionStateChanged {
        session_id: String,
        from: String,
        to: String,
    },
    ConsumerAttached {
        session_id: String,
        consumer_id: String,
    },
    ConsumerDisconnected {
        session_id: String,
        consumer_id: String,
    },
    BackendConnected {
        session_id: String,
        adapter: String,
    },
    BackendDisconnected {
        session_id: String,
        adapter: String,
    },
    PermissionRequested {
        session_id: String,
        request_id: String,
    },
    PermissionResolved {
        session_id: String,
        request_id: String,
        decision: String,
    },
    QueueMessageSent {
        session_id: String,
        message_id: String,
    },
    TeamMemberJoined {
        team_id: String,
        member_id: String,
    },
    TeamMemberLeft {
        team_id: String,
        member_id: String,
    },
    TeamTaskClaimed {
        team_id: String,
        task_id: String,
        member_id: String,
    },
    TeamTaskCompleted {
        team_id: String,
        task_id: String,
    },
    WatchdogTick,
}

impl DomainEvent {
    /// The session this event concerns, when it concerns exactly one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            DomainEvent::SessionCreated { session_id }
            | DomainEvent::SessionStateChanged { session_id, .. }
            | DomainEvent::ConsumerAttached { session_id, .. }
            | DomainEvent::ConsumerDisconnected { session_id, .. }
            | DomainEvent::BackendConnected { session_id, .. }
            | DomainEvent::BackendDisconnected { session_id, .. }
            | DomainEvent::PermissionRequested { session_id, .. }
            | DomainEvent::PermissionResolved { session_id, .. }
            | DomainEvent::QueueMessageSent { session_id, .. } => Some(session_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_extracted_for_session_scoped_events() {
        let ev = DomainEvent::SessionCreated {
            session_id: "s1".into(),
        };
        assert_eq!(ev.session_id(), Some("s1"));
    }

    #[test]
    fn session_id_none_for_team_events() {
        let ev = DomainEvent::TeamMemberJoined {
            team_id: "t1".into(),
            member_id: "m1".into(),
        };
        assert_eq!(ev.session_id(), None);
    }

    #[test]
    fn watchdog_tick_has_no_session() {
        assert_eq!(DomainEvent::WatchdogTick.session_id(), None);
    }

    #[test]
    fn serializes_with_event_tag() {
        let ev = DomainEvent::SessionCreated {
            session_id: "s1".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "session_created");
        assert_eq!(json["session_id"], "s1");
    }
}

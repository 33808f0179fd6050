//! Reconnect and idle policies. Both are pure decision functions over a
//! snapshot of session state — they never touch a `Session` directly. The
//! runtime calls `evaluate()` on a watchdog tick (or on a debounced
//! immediate sweep after a disconnect event) and is responsible for turning
//! the returned [`PolicyCommand`]s into actual effects via its own
//! `applyPolicyCommand` path. Keeping policies pure makes the grace-period
//! and timeout math trivial to test without standing up sockets or adapters.

use std::time::Duration;

use chrono::{DateTime, Utc};

use ab_domain::message::SessionState;

/// An effect a policy wants applied. The runtime, not the policy, decides
/// whether the effect still makes sense by the time it's applied — in
/// particular a `Reconnect` command must be discarded if the session has
/// already transitioned out of `starting` (e.g. its backend socket arrived
/// after the watchdog tick fired but before the command was processed). A
/// later-arriving socket always supersedes an already-queued relaunch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCommand {
    Reconnect { session_id: String },
    IdleReap { session_id: String },
}

/// A minimal read of a session's reconnect-relevant state, built fresh by
/// the runtime for each evaluation pass.
pub struct ReconnectSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub entered_state_at: DateTime<Utc>,
}

/// Relaunches sessions stuck in `starting` longer than `grace_period`.
pub struct ReconnectPolicy {
    grace_period: Duration,
}

impl ReconnectPolicy {
    pub fn new(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    pub fn default_grace_period() -> Duration {
        Duration::from_secs(5)
    }

    pub fn evaluate(&self, sessions: &[ReconnectSnapshot], now: DateTime<Utc>) -> Vec<PolicyCommand> {
        let grace = chrono::Duration::from_std(self.grace_period).unwrap_or(chrono::Duration::seconds(5));
        sessions
            .iter()
            .filter(|s| s.state == SessionState::Starting && now - s.entered_state_at > grace)
            .map(|s| PolicyCommand::Reconnect {
                session_id: s.session_id.clone(),
            })
            .collect()
    }
}

/// A minimal read of a session's idle-relevant state.
pub struct IdleSnapshot {
    pub session_id: String,
    pub consumer_count: usize,
    pub last_activity: DateTime<Utc>,
}

/// Reaps sessions with no attached consumers and no activity for longer
/// than `idle_timeout`.
pub struct IdlePolicy {
    idle_timeout: Duration,
}

impl IdlePolicy {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { idle_timeout }
    }

    pub fn default_idle_timeout() -> Duration {
        Duration::from_secs(30 * 60)
    }

    pub fn evaluate(&self, sessions: &[IdleSnapshot], now: DateTime<Utc>) -> Vec<PolicyCommand> {
        let timeout = chrono::Duration::from_std(self.idle_timeout).unwrap_or(chrono::Duration::minutes(30));
        sessions
            .iter()
            .filter(|s| s.consumer_count == 0 && now - s.last_activity > timeout)
            .map(|s| PolicyCommand::IdleReap {
                session_id: s.session_id.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_fires_only_past_grace_period() {
        let policy = ReconnectPolicy::new(Duration::from_secs(5));
        let now = Utc::now();
        let sessions = vec![
            ReconnectSnapshot {
                session_id: "fresh".into(),
                state: SessionState::Starting,
                entered_state_at: now - chrono::Duration::seconds(1),
            },
            ReconnectSnapshot {
                session_id: "stale".into(),
                state: SessionState::Starting,
                entered_state_at: now - chrono::Duration::seconds(10),
            },
        ];
        let commands = policy.evaluate(&sessions, now);
        assert_eq!(
            commands,
            vec![PolicyCommand::Reconnect {
                session_id: "stale".into()
            }]
        );
    }

    #[test]
    fn reconnect_ignores_sessions_not_in_starting() {
        let policy = ReconnectPolicy::new(Duration::from_secs(5));
        let now = Utc::now();
        let sessions = vec![ReconnectSnapshot {
            session_id: "active".into(),
            state: SessionState::Active,
            entered_state_at: now - chrono::Duration::seconds(100),
        }];
        assert!(policy.evaluate(&sessions, now).is_empty());
    }

    #[test]
    fn idle_reap_requires_zero_consumers_and_elapsed_timeout() {
        let policy = IdlePolicy::new(Duration::from_secs(60));
        let now = Utc::now();
        let sessions = vec![
            IdleSnapshot {
                session_id: "has_consumer".into(),
                consumer_count: 1,
                last_activity: now - chrono::Duration::seconds(120),
            },
            IdleSnapshot {
                session_id: "recently_active".into(),
                consumer_count: 0,
                last_activity: now - chrono::Duration::seconds(5),
            },
            IdleSnapshot {
                session_id: "stale".into(),
                consumer_count: 0,
                last_activity: now - chrono::Duration::seconds(120),
            },
        ];
        let commands = policy.evaluate(&sessions, now);
        assert_eq!(
            commands,
            vec![PolicyCommand::IdleReap {
                session_id: "stale".into()
            }]
        );
    }

    #[test]
    fn empty_snapshot_produces_no_commands() {
        let policy = IdlePolicy::new(Duration::from_secs(60));
        assert!(policy.evaluate(&[], Utc::now()).is_empty());
    }
}

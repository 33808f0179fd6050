//! Background watchdog tick: evaluates the reconnect and idle policies
//! against a fresh snapshot of every known session and feeds the resulting
//! commands back into the runtime. `SessionInfo` doesn't carry live consumer
//! counts or last-activity, so the idle snapshot is built by reaching back
//! into the live `Session` via the repository rather than the persisted
//! envelope.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use ab_runtime::{IdlePolicy, IdleSnapshot, PolicyCommand, ReconnectPolicy, ReconnectSnapshot, SessionRuntime};
use ab_sessions::SessionRepository;

use crate::launcher::Launcher;

pub struct PoliciesRunner {
    repo: Arc<SessionRepository>,
    runtime: Arc<SessionRuntime>,
    launcher: Arc<Launcher>,
    reconnect: ReconnectPolicy,
    idle: IdlePolicy,
}

impl PoliciesRunner {
    pub fn new(
        repo: Arc<SessionRepository>,
        runtime: Arc<SessionRuntime>,
        launcher: Arc<Launcher>,
        reconnect_grace: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            runtime,
            launcher,
            reconnect: ReconnectPolicy::new(reconnect_grace),
            idle: IdlePolicy::new(idle_timeout),
        }
    }

    pub async fn tick(&self) {
        let infos = self.repo.list_info();
        let now = Utc::now();

        let reconnect_snapshots: Vec<ReconnectSnapshot> = infos
            .iter()
            .map(|i| ReconnectSnapshot {
                session_id: i.id.clone(),
                state: i.state,
                entered_state_at: i.created_at,
            })
            .collect();

        let idle_snapshots: Vec<IdleSnapshot> = infos
            .iter()
            .filter_map(|i| {
                self.repo.with_session(&i.id, |s| IdleSnapshot {
                    session_id: s.id.clone(),
                    consumer_count: s.consumers.len(),
                    last_activity: s.last_activity,
                })
            })
            .collect();

        for cmd in self.reconnect.evaluate(&reconnect_snapshots, now) {
            if let Err(e) = self.runtime.apply_policy_command(cmd).await {
                tracing::warn!(error = %e, "reconnect policy command failed");
            }
        }
        for cmd in self.idle.evaluate(&idle_snapshots, now) {
            let session_id = match &cmd {
                PolicyCommand::IdleReap { session_id } => Some(session_id.clone()),
                PolicyCommand::Reconnect { .. } => None,
            };
            if let Err(e) = self.runtime.apply_policy_command(cmd).await {
                tracing::warn!(error = %e, "idle policy command failed");
                continue;
            }
            if let Some(session_id) = session_id {
                self.launcher.release(&session_id);
            }
        }
    }

    /// Run `tick` on an interval until the process exits. Intended to be
    /// handed to `tokio::spawn`.
    pub async fn run_forever(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_domain::capability::AdapterKind;
    use ab_domain::message::SessionState;
    use ab_runtime::DomainEventBus;
    use ab_sessions::storage::MemoryStorage;
    use ab_sessions::Session;

    use crate::socket_registry::SocketRegistry;

    fn runner(idle_timeout: Duration) -> (PoliciesRunner, Arc<SessionRepository>) {
        let repo = Arc::new(SessionRepository::new(Arc::new(MemoryStorage::default())));
        let bus = Arc::new(DomainEventBus::default());
        let runtime = Arc::new(SessionRuntime::new(repo.clone(), bus));
        let sockets = Arc::new(SocketRegistry::new(Duration::from_secs(30)));
        let launcher = Arc::new(Launcher::new(repo.clone(), runtime.clone(), sockets, vec!["claude".into()], 3210, 4));
        let policies = PoliciesRunner::new(repo.clone(), runtime, launcher, Duration::from_secs(5), idle_timeout);
        (policies, repo)
    }

    #[tokio::test]
    async fn tick_closes_a_consumerless_session_past_idle_timeout() {
        let (policies, repo) = runner(Duration::from_millis(10));
        let mut session = Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10);
        session.state = SessionState::Active;
        session.last_activity = Utc::now() - chrono::Duration::seconds(60);
        repo.insert(session);

        policies.tick().await;

        assert_eq!(repo.get_info("s1").unwrap().state, SessionState::Closed);
    }

    #[tokio::test]
    async fn tick_leaves_an_active_consumer_session_alone() {
        let (policies, repo) = runner(Duration::from_secs(900));
        let mut session = Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10);
        session.state = SessionState::Active;
        session.consumers.insert("c1".into());
        repo.insert(session);

        policies.tick().await;

        assert_eq!(repo.get_info("s1").unwrap().state, SessionState::Active);
    }
}

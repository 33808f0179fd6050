//! The Session Repository: an in-memory map of session id → [`Session`]
//! backed by a pluggable [`SessionStorage`] for durability. The map is the
//! only cross-session shared structure; all mutation goes through this
//! synchronized insert/get/remove surface.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use ab_domain::error::Result;
use ab_domain::message::SessionState;

use crate::model::{Session, SessionInfo};
use crate::storage::SessionStorage;

pub struct SessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionRepository {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            storage,
        }
    }

    /// Load persisted snapshots from storage. Sessions with no PID recorded
    /// (direct-connection sessions) are marked `exited`-equivalent by
    /// forcing their in-memory state to `degraded` so the reconnect
    /// watchdog re-establishes them on first consumer arrival, per the
    /// documented launcher → registry → bridge startup order.
    pub fn restore(&self, history_capacity: usize) -> Result<usize> {
        let infos = self.storage.load_all()?;
        let mut sessions = self.sessions.write();
        let mut restored = 0;
        for info in infos {
            let mut session = Session::new(info.id.clone(), info.cwd.clone(), info.adapter, history_capacity);
            session.created_at = info.created_at;
            session.backend_session_id = info.backend_session_id;
            session.pid = info.pid;
            session.pending_permissions = info.pending_permissions;
            for msg in info.message_history {
                session.history.push(msg);
            }
            session.pending_outbound = info.pending_messages.into();
            session.state = if info.pid.is_none() && info.state != SessionState::Closed {
                SessionState::Degraded
            } else {
                info.state
            };
            sessions.insert(session.id.clone(), session);
            restored += 1;
        }
        Ok(restored)
    }

    pub fn insert(&self, session: Session) {
        self.persist(&session);
        self.sessions.write().insert(session.id.clone(), session);
    }

    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(id)?;
        let result = f(session);
        Some(result)
    }

    pub fn get_info(&self, id: &str) -> Option<SessionInfo> {
        self.sessions.read().get(id).map(Session::to_info)
    }

    pub fn list_info(&self) -> Vec<SessionInfo> {
        self.sessions.read().values().map(Session::to_info).collect()
    }

    pub fn remove(&self, id: &str) -> Option<SessionInfo> {
        let removed = self.sessions.write().remove(id);
        if removed.is_some() {
            if let Err(e) = self.storage.remove(id) {
                tracing::warn!(session_id = id, error = %e, "failed to remove session snapshot");
            }
        }
        removed.as_ref().map(Session::to_info)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Persist the current snapshot of a session. Storage failures are
    /// logged and otherwise ignored: the session keeps running in memory.
    pub fn persist(&self, session: &Session) {
        let info = session.to_info();
        if let Err(e) = self.storage.save(&info) {
            tracing::warn!(session_id = %info.id, error = %e, "failed to persist session snapshot");
        }
    }

    pub fn persist_by_id(&self, id: &str) {
        if let Some(info) = self.get_info(id) {
            if let Err(e) = self.storage.save(&info) {
                tracing::warn!(session_id = id, error = %e, "failed to persist session snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use ab_domain::capability::AdapterKind;

    fn repo() -> SessionRepository {
        SessionRepository::new(Arc::new(MemoryStorage::default()))
    }

    #[test]
    fn insert_then_get_info_round_trips() {
        let repo = repo();
        let session = Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10);
        repo.insert(session);
        assert!(repo.contains("s1"));
        assert_eq!(repo.get_info("s1").unwrap().id, "s1");
    }

    #[test]
    fn remove_drops_from_repository_and_storage() {
        let repo = repo();
        repo.insert(Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10));
        assert!(repo.remove("s1").is_some());
        assert!(!repo.contains("s1"));
        assert!(repo.remove("s1").is_none());
    }

    #[test]
    fn restore_marks_pidless_sessions_degraded() {
        let storage = Arc::new(MemoryStorage::default());
        let repo = SessionRepository::new(storage.clone());
        let mut session = Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10);
        session.state = ab_domain::message::SessionState::Active;
        repo.persist(&session);

        let repo2 = SessionRepository::new(storage);
        let restored = repo2.restore(10).unwrap();
        assert_eq!(restored, 1);
        assert_eq!(
            repo2.get_info("s1").unwrap().state,
            ab_domain::message::SessionState::Degraded
        );
    }

    #[test]
    fn with_session_mutates_in_place() {
        let repo = repo();
        repo.insert(Session::new("s1".into(), "/tmp".into(), AdapterKind::Acp, 10));
        repo.with_session("s1", |s| s.model = Some("claude".into()));
        assert!(repo.with_session("missing", |_| ()).is_none());
    }
}
